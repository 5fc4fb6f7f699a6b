use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use form_state::{Binding, TransformError, TransformResult};
use futures::channel::oneshot;
use serde_json::Value;

/// Reports a fixed validation outcome and optional transform.
#[derive(Default)]
pub struct StaticBinding {
    pub errors: Option<Vec<String>>,
    pub transform: Option<Result<TransformResult, TransformError>>,
    pub validations: Cell<usize>,
}

impl StaticBinding {
    pub fn valid() -> Rc<dyn Binding> {
        Rc::new(StaticBinding::default())
    }

    pub fn failing(errors: &[&str]) -> Rc<dyn Binding> {
        Rc::new(StaticBinding {
            errors: Some(errors.iter().map(|e| e.to_string()).collect()),
            ..StaticBinding::default()
        })
    }

    pub fn transforming(result: Result<TransformResult, TransformError>) -> Rc<dyn Binding> {
        Rc::new(StaticBinding {
            transform: Some(result),
            ..StaticBinding::default()
        })
    }
}

#[async_trait(?Send)]
impl Binding for StaticBinding {
    async fn validate(&self, _: Option<Value>) -> Option<Vec<String>> {
        self.validations.set(self.validations.get() + 1);
        self.errors.clone()
    }

    async fn transform(&self) -> Result<Option<TransformResult>, TransformError> {
        self.transform.clone().transpose()
    }
}

/// Validation that only completes once its gate is opened.
pub struct GatedBinding {
    gate: RefCell<Option<oneshot::Receiver<()>>>,
    errors: Vec<String>,
}

impl GatedBinding {
    pub fn new(errors: &[&str]) -> (Rc<dyn Binding>, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let binding = GatedBinding {
            gate: RefCell::new(Some(rx)),
            errors: errors.iter().map(|e| e.to_string()).collect(),
        };
        (Rc::new(binding), tx)
    }
}

#[async_trait(?Send)]
impl Binding for GatedBinding {
    async fn validate(&self, _: Option<Value>) -> Option<Vec<String>> {
        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Some(self.errors.clone())
    }
}
