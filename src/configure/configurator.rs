//! Detection results to seed configuration.

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::defaults::{architecture_defaults, domain_defaults, optimized_volumes, safe_defaults};
use super::error::{ConfigurationError, ConfigurationResult};
use super::templates::{builtin_templates, ConfigurationTemplate, TemplateContext};
use super::types::{
    AutoConfigMetrics, AutoConfigurationResult, ConfigOverrides, GenerationMode, SeedConfiguration,
    ESSENTIAL_FIELDS,
};
use crate::detection::thresholds::configuration as limits;
use crate::detection::{Architecture, ConfidenceLevel, DetectionSummary, Domain};
use crate::strategy::{FrameworkProfile, StrategySelection};

/// Caller choices for one generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoConfigOptions {
    pub mode: GenerationMode,
    /// Applied after everything else.
    pub overrides: ConfigOverrides,
    /// Selected seeding strategy; the generic strategy when absent.
    pub selection: Option<StrategySelection>,
}

impl AutoConfigOptions {
    pub fn new(mode: GenerationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_selection(mut self, selection: StrategySelection) -> Self {
        self.selection = Some(selection);
        self
    }
}

/// Accumulates override layers and the explanation of each.
struct Layering<'a> {
    context: TemplateContext<'a>,
    merged: ConfigOverrides,
    reasoning: Vec<String>,
    warnings: Vec<String>,
    applied: Vec<String>,
}

impl Layering<'_> {
    fn push(&mut self, layer: &ConfigOverrides, reason: String) {
        self.merged = std::mem::take(&mut self.merged).merge(layer);
        self.reasoning.push(reason);
    }

    fn current(&self) -> SeedConfiguration {
        SeedConfiguration::default().apply(&self.merged)
    }
}

/// Builds seed configurations from detection results.
#[derive(Debug, Clone)]
pub struct AutoConfigurator {
    templates: Vec<ConfigurationTemplate>,
}

impl Default for AutoConfigurator {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoConfigurator {
    /// Configurator with the built-in templates.
    pub fn new() -> Self {
        Self::with_templates(builtin_templates().to_vec())
    }

    pub fn with_templates(templates: Vec<ConfigurationTemplate>) -> Self {
        Self { templates }
    }

    /// Append a template; among equal priorities, earlier templates win.
    pub fn add_template(&mut self, template: ConfigurationTemplate) {
        self.templates.push(template);
    }

    pub fn templates(&self) -> &[ConfigurationTemplate] {
        &self.templates
    }

    /// Generate a configuration. Never fails: internal errors yield the
    /// fixed fallback configuration with a warning.
    pub fn generate_configuration(
        &self,
        detection: &DetectionSummary,
        options: &AutoConfigOptions,
    ) -> AutoConfigurationResult {
        let started = Instant::now();
        let mut result = match self.try_generate(detection, options) {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(%error, mode = %options.mode, "configuration generation failed; using fallback");
                fallback_result(&error)
            }
        };
        result.metrics.execution_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            mode = %result.metrics.strategy_used,
            confidence = result.confidence,
            templates = result.metrics.templates_applied.len(),
            "seed configuration generated"
        );
        result
    }

    fn try_generate(
        &self,
        detection: &DetectionSummary,
        options: &AutoConfigOptions,
    ) -> ConfigurationResult<AutoConfigurationResult> {
        let (strategy, framework) = match &options.selection {
            Some(selection) => (selection.strategy_name.clone(), selection.profile.clone()),
            None => ("generic".to_string(), FrameworkProfile::default()),
        };
        let context = TemplateContext::new(detection, &framework);
        let mut layering = Layering {
            context,
            merged: ConfigOverrides {
                architecture: Some(context.architecture),
                domain: Some(context.domain),
                strategy: Some(strategy.clone()),
                framework: Some(framework.clone()),
                ..ConfigOverrides::default()
            },
            reasoning: vec![format!(
                "Detected {} architecture ({:.2}) and {} domain ({:.2}); strategy '{}'",
                context.architecture,
                context.architecture_confidence,
                context.domain,
                context.domain_confidence,
                strategy
            )],
            warnings: detection.warnings.clone(),
            applied: Vec::new(),
        };

        match options.mode {
            GenerationMode::Comprehensive => self.comprehensive(&mut layering)?,
            GenerationMode::Minimal => minimal(&mut layering),
            GenerationMode::Conservative => conservative(&mut layering),
            GenerationMode::Optimized => {
                self.comprehensive(&mut layering)?;
                let volumes = optimized_volumes(context.architecture, context.domain);
                layering.push(
                    &volumes,
                    format!(
                        "Tuned volumes for {} / {}: {} users, {} items each",
                        context.architecture,
                        context.domain,
                        volumes.user_count.unwrap_or_default(),
                        volumes.content_per_user.unwrap_or_default()
                    ),
                );
            }
        }

        if !options.overrides.is_empty() {
            options.overrides.check()?;
            layering.push(&options.overrides, "Applied caller overrides".to_string());
        }

        let configuration = layering.current();
        configuration.validate()?;

        let confidence = configuration_confidence(&layering.context, &layering.merged);
        Ok(AutoConfigurationResult {
            configuration,
            confidence,
            confidence_level: ConfidenceLevel::from_score(confidence),
            reasoning: layering.reasoning,
            warnings: layering.warnings,
            metrics: AutoConfigMetrics {
                execution_time_ms: 0,
                templates_applied: layering.applied,
                strategy_used: options.mode.to_string(),
            },
        })
    }

    /// Defaults, then matching templates folded lowest priority first.
    fn comprehensive(&self, layering: &mut Layering<'_>) -> ConfigurationResult<()> {
        let context = layering.context;
        layering.push(
            &architecture_defaults(context.architecture),
            format!("Applied {} architecture defaults", context.architecture),
        );
        layering.push(
            &domain_defaults(context.domain),
            format!("Applied {} domain defaults", context.domain),
        );

        let mut matching: Vec<&ConfigurationTemplate> =
            self.templates.iter().filter(|t| t.matches(&context)).collect();
        matching.sort_by(|a, b| b.priority.cmp(&a.priority));

        for template in matching.into_iter().rev() {
            template
                .overrides
                .check()
                .map_err(|e| ConfigurationError::template(template.id, e))?;
            layering.push(
                &template.overrides,
                format!("Applied template '{}' (priority {})", template.id, template.priority),
            );
            if let Some(generate) = template.generate {
                let generated = generate(&context, &layering.current());
                generated
                    .check()
                    .map_err(|e| ConfigurationError::template(template.id, e))?;
                layering.merged = std::mem::take(&mut layering.merged).merge(&generated);
            }
            layering.applied.push(template.id.to_string());
        }
        Ok(())
    }
}

/// Essential fields of the default layers, plus team sizing.
fn minimal(layering: &mut Layering<'_>) {
    let context = layering.context;
    let architecture = architecture_defaults(context.architecture);
    let layer = ConfigOverrides {
        teams_count: architecture.teams_count,
        members_per_team: architecture.members_per_team,
        ..architecture.essentials()
    };
    layering.push(&layer, format!("Applied essential {} settings", context.architecture));
    layering.push(
        &domain_defaults(context.domain).essentials(),
        format!("Applied essential {} settings", context.domain),
    );
}

/// Default layers only where their own confidence is high enough.
fn conservative(layering: &mut Layering<'_>) {
    let context = layering.context;
    let architecture_ok = context.architecture_confidence > limits::CONSERVATIVE_MIN;
    let domain_ok = context.domain_confidence > limits::CONSERVATIVE_MIN;

    if !(architecture_ok && domain_ok) {
        layering.push(&safe_defaults(), "Applied safe defaults".to_string());
    }

    if architecture_ok {
        layering.push(
            &architecture_defaults(context.architecture),
            format!("Applied {} architecture defaults", context.architecture),
        );
    } else {
        layering.merged.architecture = Some(Architecture::Individual);
        layering.warnings.push(format!(
            "Architecture confidence {:.2} is not above {:.2}; using individual accounts",
            context.architecture_confidence,
            limits::CONSERVATIVE_MIN
        ));
    }

    if domain_ok {
        layering.push(
            &domain_defaults(context.domain),
            format!("Applied {} domain defaults", context.domain),
        );
    } else {
        layering.merged.domain = Some(Domain::Generic);
        layering.warnings.push(format!(
            "Domain confidence {:.2} is not above {:.2}; using generic content",
            context.domain_confidence,
            limits::CONSERVATIVE_MIN
        ));
    }
}

/// Fraction of essential fields set, with a floor when none are.
pub fn completeness(overrides: &ConfigOverrides) -> f64 {
    match overrides.populated_essentials() {
        0 => limits::COMPLETENESS_FLOOR,
        n => n as f64 / ESSENTIAL_FIELDS.len() as f64,
    }
}

/// `detection × completeness`, nudged by architecture/domain agreement.
fn configuration_confidence(context: &TemplateContext<'_>, merged: &ConfigOverrides) -> f64 {
    let (a, d) = (context.architecture_confidence, context.domain_confidence);
    let agree = ConfidenceLevel::from_score(a) == ConfidenceLevel::from_score(d)
        || (a >= 0.7 && d >= 0.7);
    let factor = if agree {
        limits::AGREEMENT_BOOST
    } else if (a - d).abs() > limits::DIVERGENCE_GAP {
        limits::DIVERGENCE_PENALTY
    } else {
        1.0
    };
    (context.detection_confidence() * completeness(merged) * factor).clamp(0.0, 1.0)
}

fn fallback_result(error: &ConfigurationError) -> AutoConfigurationResult {
    AutoConfigurationResult {
        configuration: SeedConfiguration::default(),
        confidence: limits::FALLBACK_CONFIDENCE,
        confidence_level: ConfidenceLevel::from_score(limits::FALLBACK_CONFIDENCE),
        reasoning: vec!["Generation failed; using the minimal fallback configuration".to_string()],
        warnings: vec![format!(
            "Configuration generation failed ({}); using the minimal fallback configuration",
            error
        )],
        metrics: AutoConfigMetrics {
            execution_time_ms: 0,
            templates_applied: Vec::new(),
            strategy_used: "fallback".to_string(),
        },
    }
}

/// Write a configuration as pretty JSON, creating parent directories.
pub fn write_configuration(configuration: &SeedConfiguration, path: &Path) -> ConfigurationResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(configuration)?;
    std::fs::write(path, json)?;
    tracing::debug!(path = %path.display(), "wrote seed configuration");
    Ok(())
}
