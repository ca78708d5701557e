//! Manifest and template data types shared by the pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Category of an exported handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerCategory {
    #[serde(rename = "service")]
    Service,
    #[serde(rename = "workflow")]
    Workflow,
    #[serde(rename = "virtualObject")]
    VirtualObject,
    /// Anything the extractor reports outside the known set. Never generated.
    #[serde(other)]
    Unknown,
}

impl HandlerCategory {
    /// The three categories that produce generated constructs, in output order.
    pub const GENERATED: [HandlerCategory; 3] = [
        HandlerCategory::Service,
        HandlerCategory::Workflow,
        HandlerCategory::VirtualObject,
    ];

    /// Suffix appended to the trimmed service name for the generated construct.
    pub fn construct_suffix(self) -> &'static str {
        match self {
            HandlerCategory::Service => "Service",
            HandlerCategory::Workflow => "Workflow",
            HandlerCategory::VirtualObject | HandlerCategory::Unknown => "Object",
        }
    }

    /// SDK factory used to build the construct (`restate.<factory>(...)`).
    pub fn sdk_factory(self) -> &'static str {
        match self {
            HandlerCategory::Service => "service",
            HandlerCategory::Workflow => "workflow",
            HandlerCategory::VirtualObject | HandlerCategory::Unknown => "object",
        }
    }

    /// Directory name of the category barrel under the central output directory.
    pub fn index_dir(self) -> &'static str {
        match self {
            HandlerCategory::Service => "services",
            HandlerCategory::Workflow => "workflows",
            HandlerCategory::VirtualObject | HandlerCategory::Unknown => "objects",
        }
    }
}

/// One exported callable discovered inside a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerEntry {
    /// Exported identifier, e.g. `signupUser`
    pub export_name: String,
    /// Module specifier relative to the unit, e.g. `./user`
    #[serde(rename = "source")]
    pub source_file: String,
    #[serde(rename = "type")]
    pub category: HandlerCategory,
}

/// Extraction output for one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub handlers: Vec<HandlerEntry>,
}

impl Manifest {
    /// Number of handlers in one of the generated categories.
    pub fn generated_handler_count(&self) -> usize {
        self.handlers
            .iter()
            .filter(|h| h.category != HandlerCategory::Unknown)
            .count()
    }
}

/// Handlers of one category that share a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupedHandler {
    pub source: String,
    pub handlers: Vec<HandlerEntry>,
}

/// Groups handlers by source file.
///
/// Groups are ordered by the first appearance of their source and keep the
/// extractor's order within a group, so output is stable across runs.
pub fn group_by_source<'a>(handlers: impl IntoIterator<Item = &'a HandlerEntry>) -> Vec<GroupedHandler> {
    let mut groups: IndexMap<&str, Vec<HandlerEntry>> = IndexMap::new();
    for handler in handlers {
        groups
            .entry(handler.source_file.as_str())
            .or_default()
            .push(handler.clone());
    }

    groups
        .into_iter()
        .map(|(source, handlers)| GroupedHandler {
            source: source.to_string(),
            handlers,
        })
        .collect()
}

/// Strips the well-known category suffixes from a declared service name.
///
/// Each suffix is removed at most once, in the order `Workflow`, `Object`,
/// `Service`.
pub fn trim_category_suffixes(name: &str) -> &str {
    let mut trimmed = name;
    for suffix in ["Workflow", "Object", "Service"] {
        trimmed = trimmed.strip_suffix(suffix).unwrap_or(trimmed);
    }
    trimmed
}

/// Durable per-unit record held in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateData {
    pub service_name: String,
    pub service_name_trimmed: String,
    pub service_group: Vec<GroupedHandler>,
    pub workflow_group: Vec<GroupedHandler>,
    pub virtual_object_group: Vec<GroupedHandler>,
    /// Absolute path of the generated adapter file
    pub file_path: PathBuf,
}

impl TemplateData {
    /// Partition a manifest by category, then by source file.
    pub fn from_manifest(manifest: &Manifest, file_path: PathBuf) -> Self {
        let of = |category: HandlerCategory| {
            group_by_source(manifest.handlers.iter().filter(|h| h.category == category))
        };

        Self {
            service_name: manifest.service_name.clone(),
            service_name_trimmed: trim_category_suffixes(&manifest.service_name).to_string(),
            service_group: of(HandlerCategory::Service),
            workflow_group: of(HandlerCategory::Workflow),
            virtual_object_group: of(HandlerCategory::VirtualObject),
            file_path,
        }
    }

    /// Groups for one category.
    pub fn group(&self, category: HandlerCategory) -> &[GroupedHandler] {
        match category {
            HandlerCategory::Service => &self.service_group,
            HandlerCategory::Workflow => &self.workflow_group,
            HandlerCategory::VirtualObject => &self.virtual_object_group,
            HandlerCategory::Unknown => &[],
        }
    }

    /// True when no category holds a handler.
    pub fn is_empty(&self) -> bool {
        HandlerCategory::GENERATED
            .iter()
            .all(|c| self.group(*c).is_empty())
    }

    /// Name of the generated construct for a category, e.g. `UserManagerService`.
    pub fn construct_name(&self, category: HandlerCategory) -> String {
        format!("{}{}", self.service_name_trimmed, category.construct_suffix())
    }
}

/// File name of the generated adapter for a declared service name.
pub fn generated_file_name(service_name: &str, generated_suffix: &str) -> String {
    format!("{}{generated_suffix}", service_name.to_lowercase())
}
