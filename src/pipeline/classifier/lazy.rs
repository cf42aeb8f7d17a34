//! Load-once model handle.
//!
//! The first `get()` runs the initializer; concurrent first callers block on
//! the same initialization and all observe its result. Failures are cached
//! too, so a broken model directory is reported on every call without
//! hitting the disk again.

use std::sync::{Arc, OnceLock};

use super::ClassifierError;

type Initializer<T> = Box<dyn Fn() -> Result<T, ClassifierError> + Send + Sync>;

pub struct LazyModel<T> {
    name: &'static str,
    cell: OnceLock<Result<Arc<T>, ClassifierError>>,
    init: Initializer<T>,
}

impl<T> LazyModel<T> {
    pub fn new<F>(name: &'static str, init: F) -> Self
    where
        F: Fn() -> Result<T, ClassifierError> + Send + Sync + 'static,
    {
        Self {
            name,
            cell: OnceLock::new(),
            init: Box::new(init),
        }
    }

    /// Ready-to-use handle, or the (cached) configuration error.
    pub fn get(&self) -> Result<Arc<T>, ClassifierError> {
        self.cell
            .get_or_init(|| {
                let result = (self.init)().map(Arc::new);
                match &result {
                    Ok(_) => tracing::info!(model = self.name, "Model loaded"),
                    Err(e) => tracing::error!(model = self.name, error = %e, "Model failed to load"),
                }
                result
            })
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> std::fmt::Debug for LazyModel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyModel")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn initializes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = LazyModel::new("test", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(42u32)
        });

        assert!(!lazy.is_initialized());
        assert_eq!(*lazy.get().unwrap(), 42);
        assert_eq!(*lazy.get().unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(lazy.is_initialized());
    }

    #[test]
    fn failure_is_cached_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy: LazyModel<u32> = LazyModel::new("broken", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ClassifierError::ModelInit("corrupt".into()))
        });

        assert!(lazy.get().is_err());
        assert_eq!(lazy.get(), Err(ClassifierError::ModelInit("corrupt".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_calls_share_one_instance() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = Arc::new(LazyModel::new("shared", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(String::from("model"))
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lazy = Arc::clone(&lazy);
                std::thread::spawn(move || lazy.get().unwrap())
            })
            .collect();
        let models: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(models.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
