//! Pipeline orchestration
//!
//! Entry points that run the stages in order: scan the domain sources, build
//! the service IR, render one backend and write the result. Rendering always
//! completes before the first file is written.

use std::path::{Path, PathBuf};

use adapters::{scan_source, AdapterError, LoadPolicy, ScanReport, ScanWarning};
use analysis::ServiceIrBuilder;
use codegen::{ArtifactTree, BackendRegistry, GeneratorOptions};
use config::Config;
use ir::ServiceIR;
use path::classify_source;
use tracing::{info, info_span};

use crate::{inspection, EmissionWriter, Result};

/// Everything that shapes one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineOptions {
    /// Skip modules that fail to load instead of aborting
    pub tolerate_load_errors: bool,
    /// Options handed to the generator
    pub generator: GeneratorOptions,
    /// Output root; derived from the source when unset
    pub output_dir: Option<PathBuf>,
    /// Run rustfmt over the written files
    pub rustfmt: bool,
}

impl PipelineOptions {
    /// Options taken from a loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            tolerate_load_errors: config.scan.tolerate_load_errors,
            generator: GeneratorOptions {
                domain_crate: config.codegen.domain_crate.clone(),
                channel_capacity: config.codegen.channel_capacity,
            },
            output_dir: config.codegen.output_dir.clone(),
            rustfmt: config.codegen.rustfmt,
        }
    }

    fn load_policy(&self) -> LoadPolicy { LoadPolicy::from_tolerate(self.tolerate_load_errors) }
}

/// Outcome of [`Pipeline::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// Backend that rendered the artifacts
    pub backend: String,
    /// Output root the artifacts belong under
    pub output_dir: PathBuf,
    /// `(relative path, size in bytes)` of every artifact, in tree order
    pub artifacts: Vec<(String, usize)>,
    /// False for a dry run
    pub written: bool,
    /// Modules skipped while scanning
    pub warnings: Vec<ScanWarning>,
}

/// The stages wired together over one backend registry.
pub struct Pipeline {
    registry: BackendRegistry,
    options: PipelineOptions,
}

impl Pipeline {
    /// Pipeline over the built-in backends.
    pub fn new(options: PipelineOptions) -> Self {
        Self::with_registry(BackendRegistry::builtin(), options)
    }

    /// Pipeline over a custom registry.
    pub fn with_registry(registry: BackendRegistry, options: PipelineOptions) -> Self {
        Self { registry, options }
    }

    /// The backends this pipeline can target.
    pub fn registry(&self) -> &BackendRegistry { &self.registry }

    /// Options of this pipeline.
    pub fn options(&self) -> &PipelineOptions { &self.options }

    /// Discover the entrypoints under `source`.
    pub fn scan(&self, source: &Path) -> Result<ScanReport> {
        Ok(scan_source(source, self.options.load_policy())?)
    }

    /// Scan `source` and build its service IR.
    pub fn build_ir(&self, source: &Path) -> Result<(ServiceIR, Vec<ScanWarning>)> {
        let report = self.scan(source)?;
        let ir = ServiceIrBuilder::new(&report.catalog).build(&report.entrypoints)?;
        Ok((ir, report.warnings))
    }

    /// Render every artifact of `backend` for `ir` without touching the disk.
    pub fn render(&self, ir: &ServiceIR, backend: &str) -> Result<ArtifactTree> {
        let generator = self.registry.get(backend)?;
        let tree = generator.generate(ir, &self.options.generator)?;
        info!(backend, files = tree.len(), bytes = tree.total_bytes(), "rendered artifacts");
        Ok(tree)
    }

    /// Output root for `source`: the configured directory, else `generated`
    /// next to the scanned sources.
    pub fn output_dir(&self, source: &Path) -> Result<PathBuf> {
        match &self.options.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(classify_source(source).map_err(AdapterError::from)?.default_output_dir()),
        }
    }

    /// Run every stage for `source` and `backend`. With `dry_run` the tree is
    /// fully rendered but nothing is written.
    pub fn generate(&self, source: &Path, backend: &str, dry_run: bool) -> Result<GenerationReport> {
        let span = info_span!("generate", backend, source = %source.display());
        let _entered = span.enter();

        // Unknown backends fail before any scanning.
        self.registry.get(backend)?;
        let output_dir = self.output_dir(source)?;
        let (ir, warnings) = self.build_ir(source)?;
        let tree = self.render(&ir, backend)?;

        if !dry_run {
            EmissionWriter::new().with_rustfmt(self.options.rustfmt).write(&tree, &output_dir)?;
        }
        Ok(GenerationReport {
            backend: backend.to_string(),
            output_dir,
            artifacts: tree
                .iter()
                .map(|artifact| (artifact.path.clone(), artifact.content.len()))
                .collect(),
            written: !dry_run,
            warnings,
        })
    }

    /// Summary of the services under `source`, or the IR as pretty JSON.
    pub fn show(&self, source: &Path, json: bool) -> Result<String> {
        let (ir, _) = self.build_ir(source)?;
        if json {
            Ok(ir.to_json()?)
        } else {
            Ok(inspection::render(&ir))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn options_follow_the_configuration() {
        let mut config = Config::default();
        config.scan.tolerate_load_errors = true;
        config.codegen.domain_crate = "::shop".into();
        config.codegen.channel_capacity = 4;
        config.codegen.output_dir = Some(PathBuf::from("out"));

        let options = PipelineOptions::from_config(&config);
        assert!(options.tolerate_load_errors);
        assert_eq!(options.generator.domain_crate, "::shop");
        assert_eq!(options.generator.channel_capacity, 4);
        assert_eq!(options.output_dir, Some(PathBuf::from("out")));
        assert_eq!(options.load_policy(), LoadPolicy::Tolerate);
    }

    #[test]
    fn output_dir_defaults_next_to_the_sources() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"shop\"\n").expect("manifest");
        fs::create_dir(dir.path().join("src")).expect("src");

        let pipeline = Pipeline::new(PipelineOptions::default());
        assert_eq!(
            pipeline.output_dir(dir.path()).expect("output dir"),
            dir.path().join("src").join("generated")
        );

        let configured = Pipeline::new(PipelineOptions {
            output_dir: Some(PathBuf::from("elsewhere")),
            ..PipelineOptions::default()
        });
        assert_eq!(configured.output_dir(dir.path()).expect("output dir"), PathBuf::from("elsewhere"));
    }
}
