// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Parses the scanner container's piped stdout/stderr for its success
//! marker and the `scanId` it reports.

use crate::error::{Result, RuntimeError};
use crate::model::ScanOutcome;

const SUCCESS_MARKER: &str = "Post Scan";
const VIEW_PREFIX: &str = "ScanContainerView{";

/// Scans the container's combined output log for a `Post Scan...` success
/// line and a `ScanContainerView{scanId=<id>,...}` line, returning the
/// extracted scan id. Fails closed: a missing marker or a view line with
/// no parseable `scanId` is an error, never a guess.
pub fn parse_scan_output<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<ScanOutcome> {
    let mut saw_success = false;
    let mut scan_id = None;

    for line in lines {
        if line.contains(SUCCESS_MARKER) {
            saw_success = true;
        }
        if let Some(start) = line.find(VIEW_PREFIX) {
            scan_id = extract_scan_id(&line[start..]);
        }
    }

    if !saw_success {
        return Err(RuntimeError::NoSuccessMarker);
    }
    scan_id
        .map(|scan_id| ScanOutcome { scan_id })
        .ok_or(RuntimeError::MissingScanId)
}

fn extract_scan_id(view: &str) -> Option<String> {
    let key_pos = view.find("scanId=")?;
    let after = &view[key_pos + "scanId=".len()..];
    let end = after.find([',', '}']).unwrap_or(after.len());
    let id = after[..end].trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scan_id_from_typical_output() {
        let log = [
            "Scanning registry/ns/img:latest",
            "Post Scan report...",
            "ScanContainerView{scanId=abc-123,name=img}",
        ];
        let outcome = parse_scan_output(log).unwrap();
        assert_eq!(outcome.scan_id, "abc-123");
    }

    #[test]
    fn missing_success_marker_is_an_error() {
        let log = ["Scanning registry/ns/img:latest", "ScanContainerView{scanId=abc-123}"];
        assert!(matches!(
            parse_scan_output(log),
            Err(RuntimeError::NoSuccessMarker)
        ));
    }

    #[test]
    fn missing_view_line_is_an_error() {
        let log = ["Post Scan report..."];
        assert!(matches!(
            parse_scan_output(log),
            Err(RuntimeError::MissingScanId)
        ));
    }

    #[test]
    fn scan_id_as_final_field_before_closing_brace() {
        let log = ["Post Scan report...", "ScanContainerView{name=img,scanId=xyz}"];
        let outcome = parse_scan_output(log).unwrap();
        assert_eq!(outcome.scan_id, "xyz");
    }
}
