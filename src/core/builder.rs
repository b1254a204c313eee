//! Build orchestration
//!
//! One [`Builder`] per target kind, driven in a fixed order by
//! [`BuildPipeline`]. Every successful build persists two manifests: the
//! declared (or installed) source files and the files staged in the build
//! tree.

use std::fmt;
use std::str::FromStr;

use crate::core::config::Project;
use crate::core::deployment::Deployment;
use crate::core::installer::Installer;
use crate::core::manifest::{AssetType, Manifest, ManifestStore};
use crate::core::source::WorkspaceSource;
use crate::core::target::{Target, TargetKind};
use crate::error::{BuildError, ConfigError};
use crate::infra::device::DeviceBridge;
use crate::infra::filesystem;
use crate::infra::toolchain::CrossCompiler;

/// What a build invocation asks for: `[kind[:name]]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    /// Restrict the build to one kind
    pub kind: Option<TargetKind>,
    /// Restrict the build to one target of that kind
    pub target: Option<String>,
    /// Reinstall dependencies and tools even when current
    pub force: bool,
}

impl BuildRequest {
    /// Parse a `kind[:name]` selector; an empty selector builds everything
    pub fn parse(selector: Option<&str>, force: bool) -> Result<Self, ConfigError> {
        let selector = selector.map(str::trim).filter(|s| !s.is_empty());
        let Some(selector) = selector else {
            return Ok(Self {
                force,
                ..Self::default()
            });
        };

        let (kind, target) = match selector.split_once(':') {
            Some((kind, name)) => (kind, Some(name.to_string()).filter(|n| !n.is_empty())),
            None => (selector, None),
        };
        Ok(Self {
            kind: Some(kind.parse()?),
            target,
            force,
        })
    }

    /// True when neither a kind nor a target was named
    pub fn is_unscoped(&self) -> bool {
        self.kind.is_none()
    }

    fn selects(&self, target: &Target) -> bool {
        self.target.as_deref().map_or(true, |name| name == target.name)
    }
}

impl fmt::Display for BuildRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.target) {
            (None, _) => Ok(()),
            (Some(kind), None) => write!(f, "{kind}"),
            (Some(kind), Some(target)) => write!(f, "{kind}:{target}"),
        }
    }
}

impl FromStr for BuildRequest {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(Some(s), false)
    }
}

/// Collaborators shared by every builder during one build
#[derive(Debug)]
pub struct BuildContext<'a> {
    pub project: &'a Project,
    pub compiler: CrossCompiler,
    pub device: DeviceBridge,
    pub store: ManifestStore,
}

impl<'a> BuildContext<'a> {
    /// Context using the compiler and device configured for the project
    pub fn new(project: &'a Project) -> Self {
        Self {
            project,
            compiler: CrossCompiler::new(project.config.toolchain.compiler.clone()),
            device: DeviceBridge::from_config(&project.config.device),
            store: ManifestStore::for_workspace(&project.workspace),
        }
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: CrossCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: DeviceBridge) -> Self {
        self.device = device;
        self
    }

    fn save(
        &self,
        kind: TargetKind,
        asset: AssetType,
        target: &Target,
        manifest: &Manifest,
    ) -> Result<(), BuildError> {
        let path = self
            .store
            .save(kind, asset, target.package_name(), manifest)?;
        tracing::info!(
            "Manifest saved to {}",
            self.project.workspace.display_path(&path)
        );
        Ok(())
    }
}

/// Outcome of building one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTarget {
    pub kind: TargetKind,
    pub name: String,
    /// Declared or installed files
    pub source: Manifest,
    /// Files staged into the build tree
    pub target: Manifest,
}

/// Build strategy for one target kind
pub trait Builder {
    /// Kind of target this builder handles
    fn kind(&self) -> TargetKind;

    /// Every configured target of this kind
    fn buildables(&self, ctx: &BuildContext<'_>) -> Vec<Target> {
        ctx.project.targets(self.kind())
    }

    /// Build a single target and persist its manifests
    fn build_one(
        &self,
        ctx: &BuildContext<'_>,
        target: &Target,
        force: bool,
    ) -> Result<BuiltTarget, BuildError>;
}

/// Runs every projection task of a workspace source, then saves both manifests
fn build_projection(
    ctx: &BuildContext<'_>,
    kind: TargetKind,
    target: &Target,
) -> Result<BuiltTarget, BuildError> {
    let workspace = &ctx.project.workspace;
    let source = WorkspaceSource::new(workspace, target)?;

    for task in source.tasks() {
        let task = task?;
        tracing::info!("{}", task.describe(workspace));
        task.execute(&ctx.compiler)?;
    }

    let source_manifest = source.create_source_manifest()?;
    ctx.save(kind, AssetType::Source, target, &source_manifest)?;
    let target_manifest = source.create_target_manifest()?;
    ctx.save(kind, AssetType::Target, target, &target_manifest)?;

    Ok(BuiltTarget {
        kind,
        name: target.name.clone(),
        source: source_manifest,
        target: target_manifest,
    })
}

/// Copies resource files verbatim
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceBuilder;

impl Builder for ResourceBuilder {
    fn kind(&self) -> TargetKind {
        TargetKind::Resource
    }

    fn build_one(
        &self,
        ctx: &BuildContext<'_>,
        target: &Target,
        _force: bool,
    ) -> Result<BuiltTarget, BuildError> {
        build_projection(ctx, self.kind(), target)
    }
}

/// Copies sources, compiling those the suffix map renames
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceBuilder;

impl Builder for SourceBuilder {
    fn kind(&self) -> TargetKind {
        TargetKind::Source
    }

    fn build_one(
        &self,
        ctx: &BuildContext<'_>,
        target: &Target,
        _force: bool,
    ) -> Result<BuiltTarget, BuildError> {
        build_projection(ctx, self.kind(), target)
    }
}

/// Installs a dependency or tool, then stages its files into the build tree
#[derive(Debug, Clone, Copy)]
pub struct PackageBuilder {
    kind: TargetKind,
}

impl PackageBuilder {
    pub fn dependencies() -> Self {
        Self {
            kind: TargetKind::Dependency,
        }
    }

    pub fn tools() -> Self {
        Self {
            kind: TargetKind::Tool,
        }
    }
}

impl Builder for PackageBuilder {
    fn kind(&self) -> TargetKind {
        self.kind
    }

    fn build_one(
        &self,
        ctx: &BuildContext<'_>,
        target: &Target,
        force: bool,
    ) -> Result<BuiltTarget, BuildError> {
        let workspace = &ctx.project.workspace;
        let installer = Installer::new(ctx.project, &ctx.device, self.kind);
        let outcome = installer.install(target, force)?;
        if outcome.installed {
            tracing::info!("Installed {target}");
        }

        let deployment = Deployment::new(
            installer.install_root(),
            &outcome.manifest,
            workspace.asset_root(target.frozen),
            target.suffix_map(),
        );
        let landed = deployment.execute(&ctx.compiler, workspace)?;
        ctx.save(self.kind, AssetType::Target, target, &landed)?;

        Ok(BuiltTarget {
            kind: self.kind,
            name: target.name.clone(),
            source: outcome.manifest,
            target: landed,
        })
    }
}

/// Result of a pipeline run
#[derive(Debug, Default)]
pub struct BuildReport {
    pub built: Vec<BuiltTarget>,
    /// Qualified target name and the error that stopped it
    pub failed: Vec<(String, BuildError)>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives the builders in build order
pub struct BuildPipeline {
    builders: Vec<Box<dyn Builder>>,
}

impl fmt::Debug for BuildPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<TargetKind> = self.builders.iter().map(|b| b.kind()).collect();
        f.debug_struct("BuildPipeline").field("builders", &kinds).finish()
    }
}

impl Default for BuildPipeline {
    fn default() -> Self {
        Self {
            builders: vec![
                Box::new(ResourceBuilder),
                Box::new(SourceBuilder),
                Box::new(PackageBuilder::dependencies()),
                Box::new(PackageBuilder::tools()),
            ],
        }
    }
}

impl BuildPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove both build trees
    pub fn clean(ctx: &BuildContext<'_>) -> Result<(), BuildError> {
        let workspace = &ctx.project.workspace;
        for frozen in [false, true] {
            let root = workspace.asset_root(frozen);
            if filesystem::remove_dir_all(&root)? {
                tracing::info!("Removed {}", workspace.display_path(&root));
            }
        }
        Ok(())
    }

    /// Run the request
    ///
    /// A request naming a kind with nothing selected is an error. Failures of
    /// individual targets are collected and the remaining targets still build.
    pub fn run(
        &self,
        ctx: &BuildContext<'_>,
        request: &BuildRequest,
    ) -> Result<BuildReport, BuildError> {
        if request.is_unscoped() {
            Self::clean(ctx)?;
        }

        let mut report = BuildReport::default();
        for builder in &self.builders {
            if request.kind.is_some_and(|kind| kind != builder.kind()) {
                continue;
            }

            let selected: Vec<Target> = builder
                .buildables(ctx)
                .into_iter()
                .filter(|target| request.selects(target))
                .collect();
            if selected.is_empty() {
                if request.kind.is_some() {
                    return Err(BuildError::NoBuildables {
                        target: request.to_string(),
                    });
                }
                continue;
            }

            let names: Vec<&str> = selected.iter().map(|t| t.name.as_str()).collect();
            tracing::info!("Building {}: {}", builder.kind(), names.join(", "));

            for target in &selected {
                tracing::info!("Building {}", target.qualified_name());
                match builder.build_one(ctx, target, request.force) {
                    Ok(built) => report.built.push(built),
                    Err(e) => {
                        tracing::error!("{} failed: {e}", target.qualified_name());
                        report.failed.push((target.qualified_name(), e));
                    }
                }
            }
        }
        Ok(report)
    }
}
