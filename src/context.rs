//! The simulation context.
//!
//! A `Context` owns simulated time, the queue of future plans, the queue of pending callbacks,
//! the event subscribers and one data container per registered data plugin. Model code adds
//! behaviour through `Context*Ext` extension traits that store their state in data plugins.
//!
//! Time only moves forward. `execute` runs every queued callback before looking at the next
//! plan, so event handlers always see the state right after the plan that emitted the event.
use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::rc::Rc;

use log::trace;

use crate::error::SimError;
use crate::hashing::HashMap;
use crate::plan::Queue;

/// A type with a data container stored in the `Context`, created on first access.
pub trait DataPlugin: Any {
    type DataContainer;

    fn create_data_container() -> Self::DataContainer;
}

#[macro_export]
macro_rules! define_data_plugin {
    ($plugin:ident, $data_container:ty, $default: expr) => {
        #[derive(Copy, Clone)]
        struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

/// Marker for types that can be emitted with [`Context::emit_event`].
pub trait SimEvent: Copy + 'static {}

/// Ordering of plans scheduled for the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExecutionPhase {
    First,
    Normal,
    Last,
}

type Callback = dyn FnOnce(&mut Context);
type EventHandler<E> = dyn Fn(&mut Context, E);

pub struct Context {
    plan_queue: Queue<Box<Callback>, ExecutionPhase>,
    callback_queue: VecDeque<Box<Callback>>,
    event_handlers: HashMap<TypeId, Box<dyn Any>>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
    shutdown_requested: bool,
    abort_error: Option<SimError>,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: Queue::new(),
            callback_queue: VecDeque::new(),
            event_handlers: HashMap::default(),
            data_plugins: HashMap::default(),
            current_time: 0.0,
            shutdown_requested: false,
            abort_error: None,
        }
    }

    /// Schedules `callback` at `time` in the `Normal` phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite or in the past.
    pub fn add_plan(&mut self, time: f64, callback: impl FnOnce(&mut Context) + 'static) {
        self.add_plan_with_phase(time, callback, ExecutionPhase::Normal)
    }

    /// # Panics
    ///
    /// Panics if `time` is NaN, infinite or in the past.
    pub fn add_plan_with_phase(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) {
        assert!(
            !time.is_nan() && !time.is_infinite() && time >= self.current_time,
            "Time {time} is invalid"
        );
        self.plan_queue.add_plan(time, Box::new(callback), phase);
    }

    /// Registers `handler` to run, as a queued callback, every time an event of type `E` is
    /// emitted.
    pub fn subscribe_to_event<E: SimEvent>(
        &mut self,
        handler: impl Fn(&mut Context, E) + 'static,
    ) {
        let handler_vec = self
            .event_handlers
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::<Vec<Rc<EventHandler<E>>>>::default());
        let handler_vec: &mut Vec<Rc<EventHandler<E>>> = handler_vec.downcast_mut().unwrap();
        handler_vec.push(Rc::new(handler));
    }

    /// Queues one callback per subscriber of `E`. Events with no subscribers are dropped.
    pub fn emit_event<E: SimEvent>(&mut self, event: E) {
        let Context {
            event_handlers,
            callback_queue,
            ..
        } = self;
        if let Some(handler_vec) = event_handlers.get(&TypeId::of::<E>()) {
            let handler_vec: &Vec<Rc<EventHandler<E>>> = handler_vec.downcast_ref().unwrap();
            for handler in handler_vec {
                let handler_clone = Rc::clone(handler);
                callback_queue.push_back(Box::new(move |context| handler_clone(context, event)));
            }
        }
    }

    /// Returns the data container for `T`, creating it if this is the first access.
    pub fn get_data_container_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::create_data_container()))
            .downcast_mut::<T::DataContainer>()
            .unwrap()
    }

    /// Returns the data container for `T`, or `None` if it has never been created.
    #[must_use]
    pub fn get_data_container<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T::DataContainer>())
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Stops the run after the current plan or callback. Pending plans are dropped.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested at {}", self.current_time);
        self.shutdown_requested = true;
    }

    /// Stops the run because of a fatal error, which `execute` will return. Only the first
    /// error is kept. Callers log the error themselves.
    pub fn abort(&mut self, error: SimError) {
        trace!("aborting at t={}", self.current_time);
        if self.abort_error.is_none() {
            self.abort_error = Some(error);
        }
        self.shutdown();
    }

    /// Runs callbacks and plans until none are left, `shutdown` is called, or the run is
    /// aborted.
    pub fn execute(&mut self) -> Result<(), SimError> {
        trace!("entering event loop");
        loop {
            if self.shutdown_requested {
                self.plan_queue.clear();
                self.callback_queue.clear();
                break;
            }

            // If there is a callback, run it.
            if let Some(callback) = self.callback_queue.pop_front() {
                callback(self);
                continue;
            }

            // There aren't any callbacks, so look at the first plan.
            if let Some(plan) = self.plan_queue.get_next_plan() {
                self.current_time = plan.time;
                (plan.data)(self);
            } else {
                break;
            }
        }
        self.shutdown_requested = false;
        match self.abort_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
