//! Reactive containers.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::runtime::{with_runtime, Subscribers};

/// A shared reactive value.
///
/// Reads through [`get`](Signal::get) or [`with`](Signal::with) inside an
/// effect subscribe that effect; writes schedule every subscriber. Clones
/// share the same value and identity.
///
/// ```ignore
/// let count = signal(0);
/// let seen = count.clone();
/// effect(move || println!("count = {}", seen.get()));
/// count.set(1); // effect re-runs synchronously
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

struct SignalInner<T> {
    value: RefCell<T>,
    subscribers: Subscribers,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: 'static> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.value.try_borrow() {
            Ok(value) => f.debug_tuple("Signal").field(&*value).finish(),
            Err(_) => f.write_str("Signal(<borrowed>)"),
        }
    }
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                subscribers: Rc::new(RefCell::new(Vec::new())),
            }),
        }
    }

    /// Read the value, subscribing the current observer.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Borrow the value, subscribing the current observer. The closure must
    /// not write to this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Read without subscribing.
    pub fn peek(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Borrow without subscribing.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Write a new value. Equal values do not notify.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        if *self.inner.value.borrow() == value {
            return;
        }
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Replace the value unconditionally and return the old one.
    pub fn replace(&self, value: T) -> T {
        let old = std::mem::replace(&mut *self.inner.value.borrow_mut(), value);
        self.notify();
        old
    }

    /// Mutate in place. Always notifies.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.notify();
    }

    /// Schedule every subscriber.
    pub fn notify(&self) {
        with_runtime(|rt| rt.notify(&self.inner.subscribers));
    }

    /// Reactive identity.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    fn track(&self) {
        with_runtime(|rt| rt.track(&self.inner.subscribers));
    }
}

impl<T: Default + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Create a [`Signal`].
pub fn signal<T: 'static>(value: T) -> Signal<T> {
    Signal::new(value)
}
