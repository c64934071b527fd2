//! Ordered execution of model transformers.
//!
//! Every pre-target pass runs, in registration order, before any
//! post-target pass. A failing pass aborts the run; the model must then be
//! considered unusable.

use polygen_core::{CoreError, Model, ModelTransformOptions, TargetFeatures};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::conflicting_composition::ConflictingCompositionResolver;
use crate::elevate_properties::ElevateProperties;
use crate::generics::GenericsExtraction;
use crate::simplify_inheritance::SimplifyInheritance;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A pass over the whole model.
///
/// `transform` runs before the output target is known. The second pass
/// receives the target's capabilities and does nothing unless overridden.
pub trait ModelTransformer {
    fn name(&self) -> &'static str;

    fn transform(&self, model: &mut Model, options: &ModelTransformOptions) -> Result<(), CoreError>;

    fn transform_2nd_pass(
        &self,
        _model: &mut Model,
        _options: &ModelTransformOptions,
        _features: &TargetFeatures,
    ) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Details for transform failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformFailedDetails {
    pub transform: String,
    pub message: String,
    pub recovery_suggestion: Option<String>,
    pub context: ErrorContext,
}

impl std::fmt::Display for TransformFailedDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.transform, self.message)
    }
}

#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    #[error("Transform failed: {0}")]
    TransformFailed(Box<TransformFailedDetails>),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl PipelineError {
    /// Name of the failing pass, if the error came from one.
    pub fn transform(&self) -> Option<&str> {
        match self {
            PipelineError::TransformFailed(details) => Some(&details.transform),
            _ => None,
        }
    }
}

/// Where in the run an error happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    pub pipeline_stage: String,
    pub model: Option<String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            pipeline_stage: "unknown".to_string(),
            model: None,
        }
    }
}

fn recovery_suggestion(error: &CoreError) -> Option<String> {
    match error {
        CoreError::InvalidType(_) => {
            Some("Enable primitive inheritance for the target or remove properties from the subtype".to_string())
        }
        CoreError::InvalidSubstitution(_) => {
            Some("Disable generifyTypes or simplifyTypeHierarchy to keep the hierarchy as parsed".to_string())
        }
        CoreError::CircularDependency(_) => Some("Break the inheritance cycle in the schema".to_string()),
        _ => None,
    }
}

pub struct TransformPipeline {
    transformers: Vec<Box<dyn ModelTransformer>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self {
            transformers: Vec::new(),
        }
    }

    /// Inheritance simplification, property elevation, generics extraction,
    /// then conflicting composition resolution.
    pub fn standard() -> Self {
        Self::new()
            .with(SimplifyInheritance)
            .with(ElevateProperties)
            .with(GenericsExtraction)
            .with(ConflictingCompositionResolver)
    }

    pub fn with<T: ModelTransformer + 'static>(mut self, transformer: T) -> Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    pub fn run_pre_target(&self, model: &mut Model, options: &ModelTransformOptions) -> PipelineResult<()> {
        for transformer in &self.transformers {
            debug!("Running {} on {}", transformer.name(), model.name);
            transformer
                .transform(model, options)
                .map_err(|e| failed(transformer.name(), "pre-target", model, e))?;
        }
        Ok(())
    }

    pub fn run_post_target(
        &self,
        model: &mut Model,
        options: &ModelTransformOptions,
        features: &TargetFeatures,
    ) -> PipelineResult<()> {
        for transformer in &self.transformers {
            debug!("Running second pass of {} on {}", transformer.name(), model.name);
            transformer
                .transform_2nd_pass(model, options, features)
                .map_err(|e| failed(transformer.name(), "post-target", model, e))?;
        }
        Ok(())
    }

    /// Run both phases.
    pub fn run(
        &self,
        model: &mut Model,
        options: &ModelTransformOptions,
        features: &TargetFeatures,
    ) -> PipelineResult<()> {
        info!("Transforming model {} with {} passes", model.name, self.transformers.len());
        self.run_pre_target(model, options)?;
        self.run_post_target(model, options, features)?;
        info!("Finished transforming model {}", model.name);
        Ok(())
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

fn failed(transform: &str, stage: &str, model: &Model, error: CoreError) -> PipelineError {
    PipelineError::TransformFailed(Box::new(TransformFailedDetails {
        transform: transform.to_string(),
        recovery_suggestion: recovery_suggestion(&error),
        message: error.to_string(),
        context: ErrorContext {
            pipeline_stage: stage.to_string(),
            model: Some(model.name.clone()),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl ModelTransformer for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn transform(&self, _model: &mut Model, _options: &ModelTransformOptions) -> Result<(), CoreError> {
            self.log.borrow_mut().push(format!("{}:1", self.name));
            if self.fail {
                return Err(CoreError::Internal("boom".to_string()));
            }
            Ok(())
        }

        fn transform_2nd_pass(
            &self,
            _model: &mut Model,
            _options: &ModelTransformOptions,
            _features: &TargetFeatures,
        ) -> Result<(), CoreError> {
            self.log.borrow_mut().push(format!("{}:2", self.name));
            Ok(())
        }
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            TransformPipeline::standard().names(),
            vec![
                "SimplifyInheritance",
                "ElevateProperties",
                "GenericsExtraction",
                "ConflictingCompositionResolver"
            ]
        );
    }

    #[test]
    fn test_all_pre_target_passes_before_post_target() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pipeline = TransformPipeline::new()
            .with(Recorder { name: "a", log: log.clone(), fail: false })
            .with(Recorder { name: "b", log: log.clone(), fail: false });

        let mut model = Model::new("m");
        pipeline
            .run(&mut model, &ModelTransformOptions::default(), &TargetFeatures::GENERIC)
            .unwrap();
        assert_eq!(*log.borrow(), vec!["a:1", "b:1", "a:2", "b:2"]);
    }

    #[test]
    fn test_failure_names_the_pass_and_stops() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let pipeline = TransformPipeline::new()
            .with(Recorder { name: "bad", log: log.clone(), fail: true })
            .with(Recorder { name: "never", log: log.clone(), fail: false });

        let mut model = Model::new("m");
        let err = pipeline
            .run(&mut model, &ModelTransformOptions::default(), &TargetFeatures::GENERIC)
            .unwrap_err();
        assert_eq!(err.transform(), Some("bad"));
        assert!(err.to_string().contains("boom"));
        assert_eq!(*log.borrow(), vec!["bad:1"]);
    }
}
