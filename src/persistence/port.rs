//! Outbound ports
//!
//! A port is the app's one-way channel to its host: the app `send`s values,
//! the host `subscribe`s handlers. Delivery mirrors a browser event loop: one
//! value at a time, in send order, each handler running to completion.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Handler<T> = Box<dyn FnMut(&T)>;

struct PortInner<T> {
    handlers: RefCell<Vec<Handler<T>>>,
    /// Handlers taken out of `handlers` for the value being delivered
    in_flight: Cell<usize>,
    queue: RefCell<VecDeque<T>>,
    delivering: Cell<bool>,
}

/// Clears the delivering flag when the send loop exits, even by panic
struct DeliveryGuard<'a, T> {
    inner: &'a PortInner<T>,
}

impl<T> Drop for DeliveryGuard<'_, T> {
    fn drop(&mut self) {
        self.inner.delivering.set(false);
    }
}

/// Handlers out on loan for one value; put back (with any added meanwhile) on drop
struct Loan<'a, T> {
    inner: &'a PortInner<T>,
    handlers: Vec<Handler<T>>,
}

impl<'a, T> Loan<'a, T> {
    fn take(inner: &'a PortInner<T>) -> Self {
        let handlers = inner.handlers.take();
        inner.in_flight.set(handlers.len());
        Self { inner, handlers }
    }
}

impl<T> Drop for Loan<'_, T> {
    fn drop(&mut self) {
        let mut handlers = std::mem::take(&mut self.handlers);
        handlers.extend(self.inner.handlers.take());
        *self.inner.handlers.borrow_mut() = handlers;
        self.inner.in_flight.set(0);
    }
}

/// Single-threaded publish/subscribe port. Clones share the same subscribers.
pub struct Port<T> {
    inner: Rc<PortInner<T>>,
}

impl<T> Port<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(PortInner {
                handlers: RefCell::new(Vec::new()),
                in_flight: Cell::new(0),
                queue: RefCell::new(VecDeque::new()),
                delivering: Cell::new(false),
            }),
        }
    }

    /// Register a handler for every value sent from now on
    pub fn subscribe(&self, handler: impl FnMut(&T) + 'static) {
        self.inner.handlers.borrow_mut().push(Box::new(handler));
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.borrow().len() + self.inner.in_flight.get()
    }

    /// Push a value to all subscribers.
    ///
    /// A send made from inside a handler is queued and delivered once the
    /// current value has reached every handler.
    ///
    /// If a handler panics the panic propagates to this caller; the port stays
    /// usable and values still queued go out with the next send.
    pub fn send(&self, value: T) {
        self.inner.queue.borrow_mut().push_back(value);
        if self.inner.delivering.replace(true) {
            return;
        }
        let _guard = DeliveryGuard { inner: &*self.inner };

        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(value) = next else { break };

            // Take the handlers out so they can subscribe/send without a double borrow
            let mut loan = Loan::take(&self.inner);
            for handler in loan.handlers.iter_mut() {
                handler(&value);
            }
        }
    }
}

impl<T> Default for Port<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Port<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Port<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("subscribers", &self.subscriber_count())
            .field("queued", &self.inner.queue.borrow().len())
            .finish()
    }
}
