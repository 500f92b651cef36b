use anyhow::{bail, Result};

/// SPDX identifiers this tool accepts in resolved records. Anything outside
/// this set is a resolution failure, which keeps typos and registry junk out
/// of the NOTICE.
const KNOWN_IDS: &[&str] = &[
    "0BSD",
    "AGPL-3.0",
    "Apache-2.0",
    "Artistic-2.0",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "BSD-4-Clause",
    "BlueOak-1.0.0",
    "CC-BY-3.0",
    "CC-BY-4.0",
    "CC0-1.0",
    "CDDL-1.0",
    "EPL-1.0",
    "EPL-2.0",
    "FTL",
    "GPL-2.0",
    "GPL-3.0",
    "ISC",
    "LGPL-2.1",
    "LGPL-3.0",
    "MIT",
    "MIT-0",
    "MPL-2.0",
    "Python-2.0",
    "Unlicense",
    "WTFPL",
    "ZPL-2.1",
    "Zlib",
];

pub fn is_known_id(id: &str) -> bool {
    KNOWN_IDS.contains(&id)
}

/// One token of a compound SPDX expression like `(MIT OR Apache-2.0)`.
#[derive(Debug, PartialEq)]
pub enum ExprPart {
    Id(String),
    And,
    Or,
}

pub fn is_compound(expr: &str) -> bool {
    expr.starts_with('(')
}

/// Split an expression into identifier and operator tokens. Simple ids
/// yield a single `Id` part.
pub fn parts(expr: &str) -> Vec<ExprPart> {
    let inner = expr.trim().trim_start_matches('(').trim_end_matches(')');
    inner
        .split_whitespace()
        .map(|tok| match tok {
            "AND" => ExprPart::And,
            "OR" => ExprPart::Or,
            id => ExprPart::Id(id.to_string()),
        })
        .collect()
}

/// Just the identifiers of an expression, compound or not.
pub fn component_ids(expr: &str) -> Vec<String> {
    parts(expr)
        .into_iter()
        .filter_map(|p| match p {
            ExprPart::Id(id) => Some(id),
            _ => None,
        })
        .collect()
}

fn license_url_one(id: &str) -> String {
    format!("https://spdx.org/licenses/{}.html", id)
}

/// URL(s) to the SPDX page for a license. Compound expressions expand each
/// component, keeping the operators between them.
pub fn license_url(expr: &str, compound_ok: bool) -> Result<String> {
    if !is_compound(expr) {
        return Ok(license_url_one(expr));
    }
    if !compound_ok {
        bail!("{} is a compound license expression", expr);
    }
    let rendered: Vec<String> = parts(expr)
        .into_iter()
        .map(|p| match p {
            ExprPart::Id(id) => license_url_one(&id),
            ExprPart::And => "AND".to_string(),
            ExprPart::Or => "OR".to_string(),
        })
        .collect();
    Ok(rendered.join(" "))
}

/// Normalize common non-SPDX spellings to their SPDX equivalents.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed {
        "Apache 2.0" | "Apache License 2.0" | "Apache License, Version 2.0" | "apache-2.0" => {
            "Apache-2.0".to_string()
        }
        "MIT License" | "The MIT License" => "MIT".to_string(),
        "BSD" | "BSD License" => "BSD-3-Clause".to_string(),
        "BSD 2-Clause" | "Simplified BSD" => "BSD-2-Clause".to_string(),
        "BSD 3-Clause" | "New BSD" | "Modified BSD" => "BSD-3-Clause".to_string(),
        "GNU GPL v2" | "GPL v2" | "GPLv2" => "GPL-2.0".to_string(),
        "GNU GPL v3" | "GPL v3" | "GPLv3" => "GPL-3.0".to_string(),
        "LGPL v2.1" | "LGPLv2.1" => "LGPL-2.1".to_string(),
        "LGPL v3" | "LGPLv3" => "LGPL-3.0".to_string(),
        "Mozilla Public License 2.0" | "MPL 2.0" | "MPLv2" => "MPL-2.0".to_string(),
        "ISC License" => "ISC".to_string(),
        "CC0" | "Public Domain" => "CC0-1.0".to_string(),
        "AGPL v3" | "AGPLv3" => "AGPL-3.0".to_string(),
        other => other.to_string(),
    }
}

/// Match license text against distinctive phrases of the licenses we see in
/// practice. Returns the SPDX id on a confident match. Ordering matters:
/// more specific phrases are checked before generic ones.
pub fn infer_from_text(text: &str) -> Option<&'static str> {
    // Apache variant that links to the license instead of reproducing it
    if text.contains("Licensed under the Apache License, Version 2.0 (the \"License\")") {
        return Some("Apache-2.0");
    }
    if text.contains("Apache License") && text.contains("Version 2.0") {
        return Some("Apache-2.0");
    }
    if text.contains("This LICENSE AGREEMENT is between the Python Software Foundation") {
        return Some("Python-2.0");
    }
    if text.contains("Mozilla Public License") && text.contains("2.0") {
        return Some("MPL-2.0");
    }
    if text.contains("GNU LESSER GENERAL PUBLIC LICENSE") {
        if text.contains("Version 3") {
            return Some("LGPL-3.0");
        }
        if text.contains("Version 2.1") {
            return Some("LGPL-2.1");
        }
        return None;
    }
    if text.contains("GNU AFFERO GENERAL PUBLIC LICENSE") {
        return Some("AGPL-3.0");
    }
    if text.contains("GNU GENERAL PUBLIC LICENSE") {
        if text.contains("Version 3") {
            return Some("GPL-3.0");
        }
        if text.contains("Version 2") {
            return Some("GPL-2.0");
        }
        return None;
    }
    if text.contains("Redistribution and use in source and binary forms") {
        if text.contains("Neither the name") {
            return Some("BSD-3-Clause");
        }
        return Some("BSD-2-Clause");
    }
    if text.contains("Permission to use, copy, modify, and/or distribute this software") {
        return Some("ISC");
    }
    if text.contains("Permission is hereby granted, free of charge") {
        return Some("MIT");
    }
    if text.contains("This is free and unencumbered software released into the public domain") {
        return Some("Unlicense");
    }
    if text.contains("Creative Commons Attribution 4.0") {
        return Some("CC-BY-4.0");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ids() {
        assert!(is_known_id("MIT"));
        assert!(is_known_id("FTL"));
        assert!(!is_known_id("MIT-ish"));
    }

    #[test]
    fn test_component_ids_compound() {
        assert_eq!(
            component_ids("(BSD-2-Clause OR GPL-2.0)"),
            vec!["BSD-2-Clause", "GPL-2.0"]
        );
        assert_eq!(component_ids("MIT"), vec!["MIT"]);
    }

    #[test]
    fn test_license_url_simple() {
        assert_eq!(
            license_url("MIT", false).unwrap(),
            "https://spdx.org/licenses/MIT.html"
        );
    }

    #[test]
    fn test_license_url_compound() {
        let url = license_url("(MIT OR Apache-2.0)", true).unwrap();
        assert_eq!(
            url,
            "https://spdx.org/licenses/MIT.html OR https://spdx.org/licenses/Apache-2.0.html"
        );
        assert!(license_url("(MIT OR Apache-2.0)", false).is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("MIT License"), "MIT");
        assert_eq!(normalize("Apache License 2.0"), "Apache-2.0");
        assert_eq!(normalize("BSD"), "BSD-3-Clause");
        assert_eq!(normalize("Zlib"), "Zlib");
    }

    #[test]
    fn test_infer_mit() {
        let text = "MIT License\n\nPermission is hereby granted, free of charge, to any person";
        assert_eq!(infer_from_text(text), Some("MIT"));
    }

    #[test]
    fn test_infer_bsd_variants() {
        let bsd3 = "Redistribution and use in source and binary forms ... \
                    Neither the name of the copyright holder";
        assert_eq!(infer_from_text(bsd3), Some("BSD-3-Clause"));

        let bsd2 = "Redistribution and use in source and binary forms, with or without";
        assert_eq!(infer_from_text(bsd2), Some("BSD-2-Clause"));
    }

    #[test]
    fn test_infer_isc_before_mit() {
        let text = "Permission to use, copy, modify, and/or distribute this software for any \
                    purpose with or without fee is hereby granted";
        assert_eq!(infer_from_text(text), Some("ISC"));
    }

    #[test]
    fn test_infer_apache_pointer_variant() {
        let text = "Licensed under the Apache License, Version 2.0 (the \"License\"); you may not";
        assert_eq!(infer_from_text(text), Some("Apache-2.0"));
    }

    #[test]
    fn test_infer_unknown() {
        assert_eq!(infer_from_text("All rights reserved, call our lawyers."), None);
    }
}
