//! Recursive archive extractor.
//!
//! Unpacks into a scratch directory owned by the call, dispatches every member the
//! registry can resolve one level deeper, and tags the resulting units with
//! `archive_member` (path inside the archive) and `archive_source` (the archive
//! itself). The scratch directory is removed when the call returns, whatever the
//! outcome.

use std::path::Path;

use serde_json::Value;

use crate::core::dispatch::ExtractionContext;
use crate::core::io::traverse_directory;
use crate::extraction::archive::{ArchiveFormat, unpack};
use crate::plugins::{Extractor, path_extension};
use crate::types::{Unit, UnitType};
use crate::{Result, UnifileError};

pub(crate) const EXTENSIONS: &[&str] = &["zip", "tar", "tgz", "gz"];

#[derive(Debug, Default, Clone)]
pub struct ArchiveExtractor;

fn member_name(root: &Path, member: &Path) -> String {
    member
        .strip_prefix(root)
        .unwrap_or(member)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Tag a unit produced by a member, prefixing any member path set by a nested archive.
fn tag_member(unit: &mut Unit, member: &str, source: &Path) {
    let path = match unit.metadata().get("archive_member") {
        Some(Value::String(inner)) => format!("{}/{}", member, inner),
        _ => member.to_string(),
    };
    unit.set_metadata("archive_member", Value::String(path));
    unit.set_metadata("archive_source", Value::String(source.display().to_string()));
}

impl Extractor for ArchiveExtractor {
    fn name(&self) -> &str {
        "archive"
    }

    fn extract(&self, path: &Path, ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
        let config = ctx.config();
        if ctx.depth() >= config.archive_max_depth {
            return Ok(vec![
                Unit::error(
                    path,
                    "",
                    UnitType::File,
                    "members",
                    format!(
                        "Archive nesting depth {} reached the limit of {}",
                        ctx.depth(),
                        config.archive_max_depth
                    ),
                )
                .with_metadata("warning", "max_depth_exceeded"),
            ]);
        }

        let extension = path_extension(path).unwrap_or_default();
        let Some(format) = ArchiveFormat::detect(path, &extension) else {
            return Ok(super::failure(
                path,
                UnifileError::validation(format!("Not an archive extension: '{}'", extension)),
            ));
        };

        let scratch = match tempfile::Builder::new().prefix("unifile_unpack_").tempdir() {
            Ok(dir) => dir,
            Err(e) => return Ok(super::failure(path, e.into())),
        };
        let report = match unpack(path, format, scratch.path(), config.archive_max_bytes) {
            Ok(report) => report,
            Err(e) => return Ok(super::failure(path, e)),
        };
        for skipped in &report.skipped {
            tracing::warn!(archive = %path.display(), member = %skipped, "Skipping archive member outside the extraction root");
        }

        let members = match traverse_directory(scratch.path(), true, None::<fn(&Path) -> bool>) {
            Ok(members) => members,
            Err(e) => return Ok(super::failure(path, e)),
        };

        let mut units = Vec::new();
        let mut resolved = 0usize;
        for member in &members {
            if ctx.resolve(member)?.is_none() {
                continue;
            }
            resolved += 1;

            let name = member_name(scratch.path(), member);
            let produced = match ctx.dispatch_nested(member) {
                Ok(produced) => produced,
                Err(e) => vec![Unit::file_failure(member, path_extension(member).unwrap_or_default(), &e)],
            };
            for mut unit in produced {
                tag_member(&mut unit, &name, path);
                units.push(unit);
            }
        }

        if report.truncated {
            tracing::warn!(
                archive = %path.display(),
                limit = config.archive_max_bytes,
                written = report.bytes_written,
                "Archive size limit reached, remaining members skipped"
            );
            units.push(
                Unit::error(
                    path,
                    "",
                    UnitType::File,
                    "members",
                    format!(
                        "Archive exceeds the {} byte limit; remaining members were skipped",
                        config.archive_max_bytes
                    ),
                )
                .with_metadata("warning", "size_limit_exceeded")
                .with_metadata("archive_format", format.as_str()),
            );
        }

        if resolved == 0 {
            units.push(
                Unit::ok(path, "", UnitType::File, "members", "")
                    .with_metadata("note", "no supported files found")
                    .with_metadata("archive_format", format.as_str()),
            );
        }

        Ok(units)
    }
}
