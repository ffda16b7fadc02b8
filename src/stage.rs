//! The fixed stage table and single-stage execution.
//!
//! Each stage reads its declared inputs from the artifact store, renders its
//! prompt template, calls the generator, writes exactly one output artifact,
//! and appends one trace entry. A stage that may ask for a human decision
//! returns [`StageOutcome::NeedsDecision`] instead of writing anything.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::PipelineError;
use crate::gates::{DecisionRequest, recorded_choice};
use crate::generate::Generator;
use crate::signals::parse_decision_marker;
use crate::store::ArtifactStore;
use crate::templates::{PromptLibrary, render};
use crate::trace::{TRACE_FILE, TraceEntry, TraceLedger, fingerprint};

/// Intake outputs that must exist before a run starts.
pub const REQUIRED_INPUTS: [&str; 5] = [
    "inputs/project_spec.yml",
    "inputs/REQUIREMENTS.md",
    "inputs/CONSTRAINTS.md",
    "inputs/NON_GOALS.md",
    "inputs/ACCEPTANCE_CRITERIA.md",
];

/// Directories `bootstrap` pre-creates for later stages.
pub const OUTPUT_DIRS: [&str; 4] = ["designs", "implementations", "tests", "decisions"];

/// Placeholder that carries a replayed decision into the prompt.
pub const EXTRA_CONTEXT: &str = "extra_context";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Bootstrap,
    Design,
    Implement,
    Test,
    Verify,
}

impl Stage {
    /// Pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Bootstrap,
        Stage::Design,
        Stage::Implement,
        Stage::Test,
        Stage::Verify,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Bootstrap => "bootstrap",
            Stage::Design => "design",
            Stage::Implement => "implement",
            Stage::Test => "test",
            Stage::Verify => "verify",
        }
    }

    pub fn spec(self) -> &'static StageSpec {
        &STAGE_SPECS[self as usize]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == wanted)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown stage '{}'. Valid stages: bootstrap, design, implement, test, verify",
                    s
                )
            })
    }
}

/// A stage input: the artifact and the placeholder it fills.
#[derive(Debug)]
pub struct StageInput {
    pub placeholder: &'static str,
    pub artifact: &'static str,
}

/// Static description of a generating stage.
#[derive(Debug)]
pub struct StageSpec {
    pub stage: Stage,
    pub inputs: &'static [StageInput],
    pub output: Option<&'static str>,
    pub template: Option<&'static str>,
    /// Present when the stage may stop for a human decision.
    pub decision_summary: Option<&'static str>,
}

impl StageSpec {
    pub fn input_artifacts(&self) -> Vec<&'static str> {
        self.inputs.iter().map(|input| input.artifact).collect()
    }
}

const fn input(placeholder: &'static str, artifact: &'static str) -> StageInput {
    StageInput {
        placeholder,
        artifact,
    }
}

static STAGE_SPECS: [StageSpec; 5] = [
    StageSpec {
        stage: Stage::Bootstrap,
        inputs: &[],
        output: None,
        template: None,
        decision_summary: None,
    },
    StageSpec {
        stage: Stage::Design,
        inputs: &[
            input("requirements", "inputs/REQUIREMENTS.md"),
            input("constraints", "inputs/CONSTRAINTS.md"),
            input("non_goals", "inputs/NON_GOALS.md"),
        ],
        output: Some("designs/ARCHITECTURE.md"),
        template: Some("design.txt"),
        decision_summary: Some("Architecture choice needed"),
    },
    StageSpec {
        stage: Stage::Implement,
        inputs: &[
            input("architecture", "designs/ARCHITECTURE.md"),
            input("requirements", "inputs/REQUIREMENTS.md"),
            input("constraints", "inputs/CONSTRAINTS.md"),
        ],
        output: Some("implementations/IMPLEMENTATION.md"),
        template: Some("implement.txt"),
        decision_summary: None,
    },
    StageSpec {
        stage: Stage::Test,
        inputs: &[
            input("implementation", "implementations/IMPLEMENTATION.md"),
            input("requirements", "inputs/REQUIREMENTS.md"),
            input("acceptance_criteria", "inputs/ACCEPTANCE_CRITERIA.md"),
        ],
        output: Some("tests/TEST_RESULTS.md"),
        template: Some("test.txt"),
        decision_summary: None,
    },
    StageSpec {
        stage: Stage::Verify,
        inputs: &[
            input("test_results", "tests/TEST_RESULTS.md"),
            input("acceptance_criteria", "inputs/ACCEPTANCE_CRITERIA.md"),
            input("requirements", "inputs/REQUIREMENTS.md"),
        ],
        output: Some("tests/VERIFICATION.md"),
        template: Some("verify.txt"),
        decision_summary: None,
    },
];

/// What a completed stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub outputs: Vec<String>,
    pub model: Option<String>,
    pub prompt_fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Completed(StageReport),
    NeedsDecision(DecisionRequest),
}

/// Verify intake, reset the ledger, and pre-create output directories.
pub fn bootstrap(store: &dyn ArtifactStore) -> Result<StageReport, PipelineError> {
    let missing = store.missing(&REQUIRED_INPUTS);
    if !missing.is_empty() {
        return Err(PipelineError::IntakeIncomplete { missing });
    }

    TraceLedger::new(store).reset()?;
    for dir in OUTPUT_DIRS {
        store.ensure_dir(dir)?;
    }
    tracing::info!("bootstrap complete, ledger reset");

    Ok(StageReport {
        stage: Stage::Bootstrap,
        outputs: vec![TRACE_FILE.to_string()],
        model: None,
        prompt_fingerprint: None,
    })
}

/// Prompt context for a stage whose decision has already been recorded.
fn extra_context(store: &dyn ArtifactStore, spec: &StageSpec) -> Result<String, PipelineError> {
    let Some(summary) = spec.decision_summary else {
        return Ok(String::new());
    };
    Ok(match recorded_choice(store, summary)? {
        Some(choice) => format!("\n\nPrevious decision, chosen approach: {}\n", choice),
        None => String::new(),
    })
}

/// Runs one stage against a store and a generator.
pub struct StageExecutor<'a> {
    store: &'a dyn ArtifactStore,
    generator: &'a dyn Generator,
    prompts: &'a PromptLibrary,
}

impl<'a> StageExecutor<'a> {
    pub fn new(
        store: &'a dyn ArtifactStore,
        generator: &'a dyn Generator,
        prompts: &'a PromptLibrary,
    ) -> Self {
        Self {
            store,
            generator,
            prompts,
        }
    }

    pub async fn execute(&self, stage: Stage) -> Result<StageOutcome, PipelineError> {
        let spec = stage.spec();
        let (Some(output), Some(template_name)) = (spec.output, spec.template) else {
            return bootstrap(self.store).map(StageOutcome::Completed);
        };

        let input_names = spec.input_artifacts();
        let missing = self.store.missing(&input_names);
        if !missing.is_empty() {
            return Err(PipelineError::MissingArtifact { names: missing });
        }

        let mut vars = BTreeMap::new();
        for input in spec.inputs {
            vars.insert(input.placeholder, self.store.load(input.artifact)?);
        }
        vars.insert(EXTRA_CONTEXT, extra_context(self.store, spec)?);

        let (template, origin) = self.prompts.load(template_name)?;
        tracing::debug!(%stage, ?origin, "loaded prompt template");
        let prompt = render(stage.name(), &template, &vars)?;
        let prompt_fingerprint = fingerprint(&prompt);

        tracing::info!(
            %stage,
            model = self.generator.model(),
            fingerprint = %prompt_fingerprint,
            "generating"
        );
        let text = self.generator.generate(&prompt).await?;

        if let Some(summary) = spec.decision_summary {
            if let Some(marker) = parse_decision_marker(&text) {
                if !self.store.decision_exists(summary) {
                    return Ok(StageOutcome::NeedsDecision(DecisionRequest {
                        stage: stage.name().to_string(),
                        summary: summary.to_string(),
                        options: marker.options,
                    }));
                }
                tracing::debug!(%stage, "decision already recorded, accepting output");
            }
        }

        self.store.save(output, &text)?;
        let entry = TraceEntry::new(stage.name(), &input_names, &[output])
            .with_model(self.generator.model())
            .with_fingerprint(prompt_fingerprint.clone());
        TraceLedger::new(self.store).append(entry)?;
        tracing::info!(%stage, artifact = output, bytes = text.len(), "stage complete");

        Ok(StageOutcome::Completed(StageReport {
            stage,
            outputs: vec![output.to_string()],
            model: Some(self.generator.model().to_string()),
            prompt_fingerprint: Some(prompt_fingerprint),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{GenerationError, StoreError};
    use crate::gates::persist_decision;
    use crate::store::MemoryArtifactStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoGenerator {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl EchoGenerator {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Generator for EchoGenerator {
        fn model(&self) -> &str {
            "echo-1"
        }

        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn intake() -> MemoryArtifactStore {
        MemoryArtifactStore::with_artifacts([
            ("inputs/project_spec.yml", "name: demo\n"),
            ("inputs/REQUIREMENTS.md", "REQ"),
            ("inputs/CONSTRAINTS.md", "CON"),
            ("inputs/NON_GOALS.md", "NG"),
            ("inputs/ACCEPTANCE_CRITERIA.md", "AC"),
        ])
    }

    #[test]
    fn test_stage_table_order_and_names() {
        let names: Vec<_> = Stage::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["bootstrap", "design", "implement", "test", "verify"]);
        for stage in Stage::ALL {
            assert_eq!(stage.spec().stage, stage);
            assert_eq!(stage.name().parse::<Stage>().unwrap(), stage);
        }
        assert!("deploy".parse::<Stage>().is_err());
    }

    #[test]
    fn test_only_design_can_ask_for_decisions() {
        let gated: Vec<_> = Stage::ALL
            .into_iter()
            .filter(|s| s.spec().decision_summary.is_some())
            .collect();
        assert_eq!(gated, [Stage::Design]);
    }

    #[test]
    fn test_bootstrap_requires_all_inputs() {
        let store = MemoryArtifactStore::with_artifacts([("inputs/REQUIREMENTS.md", "x")]);
        match bootstrap(&store) {
            Err(PipelineError::IntakeIncomplete { missing }) => {
                assert_eq!(missing.len(), 4);
                assert_eq!(missing[0], "inputs/project_spec.yml");
            }
            other => panic!("Expected IntakeIncomplete, got {:?}", other),
        }
        assert!(!store.exists(TRACE_FILE));
    }

    #[test]
    fn test_bootstrap_resets_ledger_and_creates_dirs() {
        let store = intake();
        store.save(TRACE_FILE, "[{\"task\":\"old\"}]").unwrap();
        bootstrap(&store).unwrap();
        assert_eq!(store.load(TRACE_FILE).unwrap(), "[]\n");
        for dir in OUTPUT_DIRS {
            assert!(store.has_dir(dir));
        }
    }

    #[tokio::test]
    async fn test_design_writes_output_and_trace() {
        let store = intake();
        let generator = EchoGenerator::new("layered architecture");
        let prompts = PromptLibrary::bundled();
        let executor = StageExecutor::new(&store, &generator, &prompts);

        let outcome = executor.execute(Stage::Design).await.unwrap();
        let StageOutcome::Completed(report) = outcome else {
            panic!("design should complete");
        };
        assert_eq!(report.outputs, ["designs/ARCHITECTURE.md"]);
        assert_eq!(
            store.load("designs/ARCHITECTURE.md").unwrap(),
            "layered architecture"
        );

        let entries = TraceLedger::new(&store).entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].inputs,
            [
                "inputs/REQUIREMENTS.md",
                "inputs/CONSTRAINTS.md",
                "inputs/NON_GOALS.md"
            ]
        );
        assert_eq!(entries[0].model.as_deref(), Some("echo-1"));
        assert_eq!(entries[0].prompt_fingerprint, report.prompt_fingerprint);

        let prompt = generator.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("REQ"));
        assert!(prompt.contains("NG"));
        assert!(!prompt.contains("Previous decision"));
    }

    #[tokio::test]
    async fn test_marker_without_decision_writes_nothing() {
        let store = intake();
        let generator = EchoGenerator::new("DECISION_REQUIRED: monolith | microservices");
        let prompts = PromptLibrary::bundled();
        let executor = StageExecutor::new(&store, &generator, &prompts);

        match executor.execute(Stage::Design).await.unwrap() {
            StageOutcome::NeedsDecision(request) => {
                assert_eq!(request.stage, "design");
                assert_eq!(request.summary, "Architecture choice needed");
                assert_eq!(request.options, ["monolith", "microservices"]);
            }
            other => panic!("Expected NeedsDecision, got {:?}", other),
        }
        assert!(!store.exists("designs/ARCHITECTURE.md"));
        assert!(TraceLedger::new(&store).entries().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recorded_decision_is_replayed_and_marker_accepted() {
        let store = intake();
        persist_decision(&store, "Architecture choice needed", "microservices").unwrap();
        let generator = EchoGenerator::new("DECISION_REQUIRED: a | b");
        let prompts = PromptLibrary::bundled();
        let executor = StageExecutor::new(&store, &generator, &prompts);

        let outcome = executor.execute(Stage::Design).await.unwrap();
        assert!(matches!(outcome, StageOutcome::Completed(_)));
        assert!(store.exists("designs/ARCHITECTURE.md"));

        let prompt = generator.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("chosen approach: microservices"));
    }

    #[tokio::test]
    async fn test_decision_without_choice_fails_before_generating() {
        let store = intake();
        store
            .save(
                "decisions/architecture_choice_needed.md",
                "# Decision: Architecture choice needed\n\n",
            )
            .unwrap();
        let generator = EchoGenerator::new("DECISION_REQUIRED: a | b");
        let prompts = PromptLibrary::bundled();
        let executor = StageExecutor::new(&store, &generator, &prompts);

        match executor.execute(Stage::Design).await {
            Err(PipelineError::Store(StoreError::Corrupt { name, .. })) => {
                assert_eq!(name, "decisions/architecture_choice_needed.md")
            }
            other => panic!("Expected a corrupt decision error, got {:?}", other),
        }
        assert!(generator.prompts.lock().unwrap().is_empty());
        assert!(!store.exists("designs/ARCHITECTURE.md"));
    }

    #[tokio::test]
    async fn test_missing_inputs_are_aggregated() {
        let store = MemoryArtifactStore::with_artifacts([("inputs/REQUIREMENTS.md", "REQ")]);
        let generator = EchoGenerator::new("x");
        let prompts = PromptLibrary::bundled();
        let executor = StageExecutor::new(&store, &generator, &prompts);

        match executor.execute(Stage::Test).await {
            Err(PipelineError::MissingArtifact { names }) => assert_eq!(
                names,
                [
                    "implementations/IMPLEMENTATION.md",
                    "inputs/ACCEPTANCE_CRITERIA.md"
                ]
            ),
            other => panic!("Expected MissingArtifact, got {:?}", other),
        }
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_gated_stage_ignores_marker() {
        let store = intake();
        store.save("designs/ARCHITECTURE.md", "arch").unwrap();
        let generator = EchoGenerator::new("DECISION_REQUIRED: x | y");
        let prompts = PromptLibrary::bundled();
        let executor = StageExecutor::new(&store, &generator, &prompts);

        let outcome = executor.execute(Stage::Implement).await.unwrap();
        assert!(matches!(outcome, StageOutcome::Completed(_)));
    }
}
