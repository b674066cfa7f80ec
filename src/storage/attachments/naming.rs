// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Logical name <-> physical key conversion.
//!
//! Callers only ever see logical names (`physical_exams/2024/03/report.pdf`).
//! The bytes on disk live under the physical key, which is the logical name
//! plus [`ENCRYPTED_SUFFIX`]. Every operation of the attachment store goes
//! through one of the two conversions below.

use super::{AttachmentError, AttachmentResult};

/// Suffix marking an encrypted payload on disk.
pub const ENCRYPTED_SUFFIX: &str = ".encrypted";

/// Convert a logical name (or an already-physical key) to its physical key.
///
/// Idempotent: a name that already ends with the suffix is returned as-is.
pub fn logical_to_physical(name: &str) -> String {
    if name.ends_with(ENCRYPTED_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{ENCRYPTED_SUFFIX}")
    }
}

/// Convert a physical key (or an already-logical name) to its logical name.
pub fn physical_to_logical(key: &str) -> &str {
    key.strip_suffix(ENCRYPTED_SUFFIX).unwrap_or(key)
}

/// Reject names that could escape the storage root or alias another file.
///
/// Names are `/`-separated relative paths with no empty, `.` or `..`
/// components.
pub fn validate_name(name: &str) -> AttachmentResult<()> {
    let invalid = |reason: &str| AttachmentError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.contains('\0') {
        return Err(invalid("name contains a NUL byte"));
    }
    if name.contains('\\') {
        return Err(invalid("name contains a backslash"));
    }
    if name.starts_with('/') {
        return Err(invalid("name must be relative"));
    }
    for component in name.split('/') {
        match component {
            "" => return Err(invalid("name contains an empty path component")),
            "." | ".." => return Err(invalid("name contains a relative path component")),
            _ => {}
        }
    }
    Ok(())
}

/// Split a logical name into `(directory, stem, extension)`.
///
/// The directory keeps its trailing `/`; the extension keeps its leading
/// `.`. Either may be empty.
pub(crate) fn split_name(name: &str) -> (&str, &str, &str) {
    let (dir, file) = match name.rfind('/') {
        Some(idx) => name.split_at(idx + 1),
        None => ("", name),
    };
    match file.rfind('.') {
        Some(idx) if idx > 0 => {
            let (stem, ext) = file.split_at(idx);
            (dir, stem, ext)
        }
        _ => (dir, file, ""),
    }
}

/// Last path component of a logical name.
pub fn file_name(name: &str) -> &str {
    let logical = physical_to_logical(name);
    logical.rsplit('/').next().unwrap_or(logical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_to_physical_appends_suffix_once() {
        assert_eq!(logical_to_physical("a/report.pdf"), "a/report.pdf.encrypted");
        assert_eq!(
            logical_to_physical("a/report.pdf.encrypted"),
            "a/report.pdf.encrypted"
        );
    }

    #[test]
    fn physical_to_logical_strips_suffix_once() {
        assert_eq!(physical_to_logical("a/report.pdf.encrypted"), "a/report.pdf");
        assert_eq!(physical_to_logical("a/report.pdf"), "a/report.pdf");
        // Only the trailing marker is removed
        assert_eq!(
            physical_to_logical("x.encrypted.encrypted"),
            "x.encrypted"
        );
    }

    #[test]
    fn conversions_are_inverse() {
        for name in ["report.pdf", "physical_exams/2024/03/report.pdf", "scan"] {
            assert_eq!(physical_to_logical(&logical_to_physical(name)), name);
        }
    }

    #[test]
    fn validate_accepts_nested_relative_names() {
        assert!(validate_name("physical_exams/2024/03/report.pdf").is_ok());
        assert!(validate_name("report.pdf.encrypted").is_ok());
        assert!(validate_name("blood test, march.pdf").is_ok());
    }

    #[test]
    fn validate_rejects_traversal_and_absolute_names() {
        for bad in [
            "",
            "/etc/passwd",
            "../secret.pdf",
            "a/../../b.pdf",
            "a/./b.pdf",
            "a//b.pdf",
            "dir/",
            "a\\b.pdf",
            "nul\0.pdf",
        ] {
            assert!(
                matches!(validate_name(bad), Err(AttachmentError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn split_name_separates_parts() {
        assert_eq!(
            split_name("physical_exams/2024/report.pdf"),
            ("physical_exams/2024/", "report", ".pdf")
        );
        assert_eq!(split_name("report"), ("", "report", ""));
        assert_eq!(split_name(".hidden"), ("", ".hidden", ""));
        assert_eq!(split_name("a/archive.tar.gz"), ("a/", "archive.tar", ".gz"));
    }

    #[test]
    fn file_name_is_logical() {
        assert_eq!(file_name("a/b/report.pdf.encrypted"), "report.pdf");
        assert_eq!(file_name("report.pdf"), "report.pdf");
    }
}
