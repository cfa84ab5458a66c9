// In: src/pipeline/builder.rs

use super::Pipeline;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::stage::Transform;

struct PendingStage<T> {
    name: Option<String>,
    transform: Box<dyn Transform<T>>,
}

/// Collects transforms in chain order, then wires and starts the pipeline.
///
/// ```
/// use stagepipe::Pipeline;
///
/// let mut pipeline = Pipeline::builder()
///     .stage("add-five", |v: &mut i32| *v += 5)
///     .stage("add-ten", |v: &mut i32| *v += 10)
///     .build()
///     .unwrap();
///
/// let handle = pipeline.submit(1).unwrap();
/// pipeline.close().unwrap();
/// assert_eq!(handle.get().unwrap(), 16);
/// ```
pub struct PipelineBuilder<T> {
    config: PipelineConfig,
    stages: Vec<PendingStage<T>>,
}

impl<T: Send + 'static> PipelineBuilder<T> {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            stages: Vec::new(),
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Appends a named stage.
    pub fn stage(mut self, name: impl Into<String>, transform: impl Transform<T>) -> Self {
        self.stages.push(PendingStage {
            name: Some(name.into()),
            transform: Box::new(transform),
        });
        self
    }

    /// Appends a stage named from the config (or `stage-<index>`).
    pub fn transform(self, transform: impl Transform<T>) -> Self {
        self.boxed(Box::new(transform))
    }

    /// Appends an already-boxed transform.
    pub fn boxed(mut self, transform: Box<dyn Transform<T>>) -> Self {
        self.stages.push(PendingStage {
            name: None,
            transform,
        });
        self
    }

    pub fn build(self) -> Result<Pipeline<T>> {
        // Checked first so that an empty pipeline allocates nothing.
        if self.stages.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }
        self.config.validate()?;

        let config = self.config;
        let (names, transforms): (Vec<String>, Vec<Box<dyn Transform<T>>>) = self
            .stages
            .into_iter()
            .enumerate()
            .map(|(index, pending)| {
                let name = pending.name.unwrap_or_else(|| config.stage_name(index));
                (name, pending.transform)
            })
            .unzip();

        Pipeline::launch(config, names, transforms)
    }
}

impl<T: Send + 'static> Default for PipelineBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_fails() {
        let result = PipelineBuilder::<u8>::new().build();
        assert!(matches!(result, Err(PipelineError::EmptyPipeline)));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_launch() {
        let config = PipelineConfig {
            name: "  ".to_string(),
            ..PipelineConfig::default()
        };
        let result = PipelineBuilder::new()
            .config(config)
            .transform(|_: &mut u8| {})
            .build();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_names_come_from_builder_then_config_then_index() {
        let config = PipelineConfig {
            stage_names: vec!["from-config".to_string()],
            ..PipelineConfig::default()
        };
        let pipeline = PipelineBuilder::new()
            .config(config)
            .transform(|_: &mut u8| {})
            .stage("explicit", |_: &mut u8| {})
            .transform(|_: &mut u8| {})
            .build()
            .unwrap();

        assert_eq!(
            pipeline.stage_names(),
            vec!["from-config", "explicit", "stage-2"]
        );
        pipeline.shutdown().unwrap();
    }
}
