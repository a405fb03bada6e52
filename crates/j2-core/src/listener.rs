//! Listener callbacks, invocation context and return verdicts

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::BoxError;

/// Dispatcher identity, used as the default invocation context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatcherId(u64);

impl DispatcherId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DispatcherId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Invocation target handed to a callback
#[derive(Clone)]
pub enum Context {
    /// The dispatcher the listener was registered on
    Dispatcher(DispatcherId),
    /// Caller-supplied target
    Target(Rc<dyn Any>),
}

impl Context {
    /// Wrap a value as an invocation target
    pub fn target<T: Any>(value: T) -> Self {
        Context::Target(Rc::new(value))
    }

    /// Borrow the target as `T`, if it is one
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            Context::Target(target) => target.downcast_ref::<T>(),
            Context::Dispatcher(_) => None,
        }
    }

    /// Dispatcher id when the context is the dispatcher itself
    pub fn dispatcher_id(&self) -> Option<DispatcherId> {
        match self {
            Context::Dispatcher(id) => Some(*id),
            Context::Target(_) => None,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Dispatcher(id) => f.debug_tuple("Dispatcher").field(id).finish(),
            Context::Target(_) => f.write_str("Target(..)"),
        }
    }
}

/// What a callback asks of the code that fired the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// No opinion
    #[default]
    Continue,
    /// Suppress the default action. Makes `fire` return `false`.
    PreventDefault,
}

impl From<()> for Verdict {
    fn from(_: ()) -> Self {
        Verdict::Continue
    }
}

impl From<bool> for Verdict {
    fn from(value: bool) -> Self {
        if value {
            Verdict::Continue
        } else {
            Verdict::PreventDefault
        }
    }
}

type Callback<A> = dyn Fn(&Context, &mut A) -> Result<Verdict, BoxError>;

/// Shared listener callback.
///
/// Identity is the allocation: clones compare equal, two listeners built from
/// identical closures do not.
pub struct Listener<A> {
    callback: Rc<Callback<A>>,
}

impl<A> Listener<A> {
    /// Listener that cannot fail
    pub fn new<F, V>(f: F) -> Self
    where
        A: 'static,
        F: Fn(&Context, &mut A) -> V + 'static,
        V: Into<Verdict>,
    {
        Self {
            callback: Rc::new(move |ctx: &Context, args: &mut A| -> Result<Verdict, BoxError> {
                Ok(f(ctx, args).into())
            }),
        }
    }

    /// Listener whose errors abort the dispatch they run in
    pub fn fallible<F, V, E>(f: F) -> Self
    where
        A: 'static,
        F: Fn(&Context, &mut A) -> Result<V, E> + 'static,
        V: Into<Verdict>,
        E: Into<BoxError>,
    {
        Self {
            callback: Rc::new(move |ctx: &Context, args: &mut A| -> Result<Verdict, BoxError> {
                f(ctx, args).map(Into::into).map_err(Into::into)
            }),
        }
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Listener<A>) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.callback), Rc::as_ptr(&other.callback))
    }

    /// Invoke the callback directly, outside any dispatcher
    pub fn call(&self, ctx: &Context, args: &mut A) -> Result<Verdict, BoxError> {
        (self.callback)(ctx, args)
    }
}

impl<A> Clone for Listener<A> {
    fn clone(&self) -> Self {
        Self {
            callback: Rc::clone(&self.callback),
        }
    }
}

impl<A> fmt::Debug for Listener<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.callback) as *const ())
    }
}
