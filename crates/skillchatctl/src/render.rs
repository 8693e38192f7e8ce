//! Output rendering for skillchatctl.
//!
//! Formats skill listings, chat results and probe reports for terminal display.
//! The probe report doubles as the markdown written to the output directory.

use std::fmt::Write as _;

use skillchat_core::skills::partition_by_source;
use skillchat_core::{InferenceResult, SkillInfo, ToolUse};

const RULE_WIDTH: usize = 80;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Skills grouped into custom and pre-built sections, followed by a summary.
/// `configured` is the default skill id, checked against the listed ids.
pub fn format_skill_list(skills: &[SkillInfo], configured: Option<&str>) -> String {
    if skills.is_empty() {
        return "No skills found.\n".to_string();
    }

    let (custom, prebuilt) = partition_by_source(skills);
    let mut out = String::new();

    if !custom.is_empty() {
        let _ = writeln!(out, "{}\nCUSTOM SKILLS\n{}", rule(), rule());
        for skill in &custom {
            write_skill(&mut out, skill);
        }
    }

    if !prebuilt.is_empty() {
        let _ = writeln!(out, "{}\nPRE-BUILT SKILLS\n{}", rule(), rule());
        for skill in &prebuilt {
            write_skill(&mut out, skill);
        }
    }

    let _ = writeln!(
        out,
        "{}\nSUMMARY: {} custom, {} pre-built\n{}",
        rule(),
        custom.len(),
        prebuilt.len(),
        rule()
    );

    if let Some(id) = configured {
        if skills.iter().any(|s| s.id == id) {
            let _ = writeln!(out, "\nCLAUDE_SKILL_ID ({id}) is valid.");
        } else {
            let _ = writeln!(
                out,
                "\nwarning: CLAUDE_SKILL_ID ({id}) not found in this account\n  → available skill ids are listed above"
            );
        }
    }

    out
}

fn write_skill(out: &mut String, skill: &SkillInfo) {
    let _ = writeln!(out, "\n* {}", skill.name);
    let _ = writeln!(out, "  ID:          {}", skill.id);
    let _ = writeln!(
        out,
        "  Description: {}",
        skill.description.as_deref().unwrap_or("N/A")
    );
    out.push('\n');
}

/// Print a chat result.
pub fn print_chat_result(session_id: &str, result: &InferenceResult) {
    println!("{}", result.response_text);
    for tool in &result.tool_uses {
        println!("{}", format_tool_use(tool));
    }
    println!();
    println!(
        "[session {}] usage: {} input tokens, {} output tokens",
        session_id, result.usage.input_tokens, result.usage.output_tokens
    );
}

fn format_tool_use(tool: &ToolUse) -> String {
    format!("\n[Tool Used: {}]\nInput: {}", tool.name, tool.input)
}

/// Header of a probe report: which skill, which question.
pub fn probe_header(skill_id: &str, question: &str) -> String {
    format!(
        "# Skill Probe\n\nSkill ID: {skill_id}\n\n{}\nQUESTION: {question}\n{}\n",
        rule(),
        rule()
    )
}

/// Body of a successful probe: response text, tool uses and usage.
pub fn probe_body(result: &InferenceResult) -> String {
    let mut out = String::from("\nRESPONSE:\n\n");
    out.push_str(&result.response_text);
    out.push('\n');
    for tool in &result.tool_uses {
        out.push_str(&format_tool_use(tool));
        out.push('\n');
    }
    let _ = write!(
        out,
        "\n{}\nUsage: {} input tokens, {} output tokens\n{}\n",
        rule(),
        result.usage.input_tokens,
        result.usage.output_tokens,
        rule()
    );
    out
}
