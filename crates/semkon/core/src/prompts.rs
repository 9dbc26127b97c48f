//! Prompt text and tool contracts for the two oracle requests.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::format::format_file;
use crate::types::PropertyLocation;

/// Tool the extraction model must call with its findings.
pub const RECORD_PROPOSITIONS_TOOL: &str = "record_propositions";

/// Terminal tool the checking agent calls with its verdict.
pub const REPORT_VERDICT_TOOL: &str = "report_verdict";

/// Tool contract the model may call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolContract {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Schema of the extraction response.
pub fn propositions_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["data"],
        "properties": {
            "data": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["line_num", "statement", "proof"],
                    "properties": {
                        "line_num": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "Line number where the proposition statement begins"
                        },
                        "statement": { "type": "string" },
                        "proof": { "type": "string" }
                    },
                    "additionalProperties": false
                }
            }
        },
        "additionalProperties": false
    })
}

/// Schema of the checking verdict.
pub fn verdict_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["correctness", "explanation"],
        "properties": {
            "correctness": {
                "type": "string",
                "enum": ["correct", "incorrect", "unknown"]
            },
            "explanation": { "type": "string" }
        },
        "additionalProperties": false
    })
}

pub fn record_propositions_tool() -> ToolContract {
    ToolContract {
        name: RECORD_PROPOSITIONS_TOOL.into(),
        description: "Record every qualifying proposition found in the file. \
            Call with an empty list when there are none."
            .into(),
        input_schema: propositions_schema(),
    }
}

pub fn report_verdict_tool() -> ToolContract {
    ToolContract {
        name: REPORT_VERDICT_TOOL.into(),
        description: "Report the final verdict on the proof. Call exactly once, \
            after the investigation is complete."
            .into(),
        input_schema: verdict_schema(),
    }
}

/// Extraction prompt for one file.
///
/// A blank `topic_filter` is treated as absent.
pub fn extraction_prompt(content: &str, rel_path: Option<&Path>, topic_filter: Option<&str>) -> String {
    let filter_text = match topic_filter.map(str::trim) {
        Some(filter) if !filter.is_empty() => format!("* {filter}"),
        _ => String::new(),
    };

    format!(
        "The following file is taken from a repository of source code.
It may (or may not) contain one or more formal propositions that have something to do with the codebase.
These would be written as developer documentation. They may be called \"properties\", \"theorems\", etc.
Extract all such propositions that satisfy the following criteria:
* They are written in natural language, not a programming language.
* They are in a mathematical style, like a computer scientist would write.
* They are explicitly labeled as a \"property\" or \"theorem\" or similar,
  and have an associated explicitly-labeled proof.
{filter_text}

For example, there may be propositions about running times,
correctness, or auxiliary facts.

Report the results with the `{RECORD_PROPOSITIONS_TOOL}` tool. `line_num` is the
line number shown in the left margin where the proposition's statement begins.

{formatted}",
        formatted = format_file(content, rel_path),
    )
}

/// Checking prompt for one location.
pub fn correctness_prompt(location: &PropertyLocation) -> String {
    format!(
        "
The file {rel_path} contains one or more propositions
about the codebase. The proposition we are interested in is on line
{line_num}, and is followed by a proof.

State whether the proof is correct.

By \"correct\", we mean very high confidence that each step of the proof is valid,
the proof does in fact prove the proposition, and that the proof is supported by
what the code does. Mark the proof as \"incorrect\" if you understand it and the
code but the proof is wrong. Use \"unknown\" if e.g. you don't 100% know how an
external library works, or the proof needs more detail. Think hard: Skeptically
and rigorously check every claim with references to the code. If the proof
references an explicitly-stated axiom (or \"assumption\", etc) found in the
codebase, you can assume that the axiom is true. If the proof references another
proposition from the codebase, you can assume that the other proposition is true
if the codebase provides a proof for it (you don't have to check that proof) or
if it's well-known or if a reference to the literature is provided. However, if
the proof we're checking is part of a cycle of dependencies where the proof of
one proposition relies on the truth of the next, report this proof as
\"incorrect\".

Use the repository tools to read the code. When you are done, call
`{REPORT_VERDICT_TOOL}` exactly once with your verdict and explanation.",
        rel_path = location.relative_path.display(),
        line_num = location.line_number,
    )
}

/// System prompt for the checking agent.
pub fn checker_system_prompt() -> &'static str {
    "You are a meticulous reviewer of informal correctness proofs in a source repository. \
     You can read files but never modify them. All paths are relative to the repository root."
}
