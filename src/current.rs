// Thread-local "current context" handle.
//
// Contexts are plain owned values; this registry exists for callers that
// want the classic make-current style instead of passing `&mut Context`
// around. The slot is strictly per-thread.

use std::cell::RefCell;

use crate::context::Context;

thread_local! {
    static CURRENT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// Install `context` as this thread's current context, returning the
/// previously installed one.
pub fn make_current(context: Context) -> Option<Context> {
    CURRENT.with(|slot| slot.borrow_mut().replace(context))
}

/// Remove and return this thread's current context.
pub fn take_current() -> Option<Context> {
    CURRENT.with(|slot| slot.borrow_mut().take())
}

/// Run `f` against this thread's current context. Returns `None` when no
/// context is current.
pub fn with_current<R>(f: impl FnOnce(&mut Context) -> R) -> Option<R> {
    CURRENT.with(|slot| slot.borrow_mut().as_mut().map(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::{DataType, PixelFormat};

    #[test]
    fn make_current_and_take_round_trip() {
        assert!(take_current().is_none());
        let ctx = Context::new(2, 2, PixelFormat::Rgba, DataType::UnsignedByte).unwrap();
        assert!(make_current(ctx).is_none());
        assert!(with_current(|ctx| ctx.main_framebuffer().width()).is_some());
        assert!(take_current().is_some());
        assert!(with_current(|_| ()).is_none());
    }

    #[test]
    fn replacing_returns_the_previous_context() {
        let a = Context::new(2, 2, PixelFormat::Rgba, DataType::UnsignedByte).unwrap();
        let b = Context::new(4, 4, PixelFormat::Rgba, DataType::UnsignedByte).unwrap();
        make_current(a);
        let previous = make_current(b).unwrap();
        assert_eq!(previous.main_framebuffer().width(), 2);
        assert_eq!(take_current().unwrap().main_framebuffer().width(), 4);
    }
}
