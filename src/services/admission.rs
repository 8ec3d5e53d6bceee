//! Glob-based admission filtering for the upload queue.
//!
//! Two independent exclusion lists are applied to each candidate: one
//! against the file name, one against every component of the relative
//! destination path. A candidate is admitted iff it matches no pattern
//! in either list. Rejections are silent by default.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::model::upload_item::UploadRequest;
use crate::settings::filter_config::{FilterPolicySource, MatchOptions};

/// Compiled exclusion rules, rebuilt from the policy source on every
/// enqueue call so pattern changes apply to subsequent admissions.
pub struct ExclusionFilter {
    files: GlobSet,
    folders: GlobSet,
}

impl ExclusionFilter {
    pub fn from_policy(policy: &dyn FilterPolicySource) -> Self {
        ExclusionFilter {
            files: build_set(&policy.excluded_files(), policy.file_match_options()),
            folders: build_set(&policy.excluded_folders(), policy.folder_match_options()),
        }
    }

    /// True if the request passes both exclusion lists
    pub fn allows(&self, request: &UploadRequest) -> bool {
        self.is_name_allowed(&request.name) && self.is_parent_allowed(request)
    }

    fn is_name_allowed(&self, name: &str) -> bool {
        !self.files.is_match(name)
    }

    fn is_parent_allowed(&self, request: &UploadRequest) -> bool {
        match &request.options.path {
            Some(path) => !path
                .split('/')
                .filter(|component| !component.is_empty())
                .any(|component| self.folders.is_match(component)),
            None => true,
        }
    }
}

/// Compiles a pattern list into a matcher. A pattern that fails to
/// compile is skipped with a warning and never matches anything.
fn build_set(patterns: &[String], options: MatchOptions) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(!options.case_sensitive)
            .literal_separator(options.literal_separator)
            .backslash_escape(options.backslash_escape)
            .build();
        match glob {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => {
                warn!("skipping malformed exclusion pattern {:?}: {}", pattern, err);
            }
        }
    }
    builder.build().unwrap_or_else(|err| {
        warn!("failed to compile exclusion set: {}", err);
        GlobSet::empty()
    })
}
