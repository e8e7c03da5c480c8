//! Edit emission
//!
//! Renders a [`RewritePlan`] into the text of the new switch. Bodies are
//! copied from the source and re-indented one level under their label;
//! comments the plan carries are re-emitted on their own lines.

use crate::edit::{Fix, FixKind, TextEdit};
use crate::source_utils::{indent_at, reindent};

use super::plan::{ArmBody, PlannedArm, RewritePlan};
use super::Context;

/// Replacement text for `plan.replace`.
pub fn render(ctx: &Context<'_>, plan: &RewritePlan) -> String {
    let base = indent_at(ctx.source, plan.replace.start).to_string();
    let arm_indent = format!("{}{}", base, ctx.indent_unit);
    let body_indent = format!("{}{}", arm_indent, ctx.indent_unit);

    let mut out = String::new();
    out.push_str(plan.form.prefix());
    out.push_str("switch (");
    out.push_str(&plan.selector);
    out.push_str(") {\n");
    for comment in &plan.leading {
        push_comment(&mut out, comment, &arm_indent);
        out.push('\n');
    }
    for arm in &plan.arms {
        for comment in &arm.leading {
            push_comment(&mut out, comment, &arm_indent);
            out.push('\n');
        }
        out.push_str(&arm_indent);
        out.push_str(&arm.label.to_string());
        out.push_str(" ->");
        render_body(ctx, arm, &arm_indent, &body_indent, &mut out);
        out.push('\n');
    }
    out.push_str(&base);
    out.push('}');
    if plan.form.is_expression() {
        out.push(';');
    }
    out
}

/// The replacement followed by the plan's other edits.
pub fn edits(ctx: &Context<'_>, plan: &RewritePlan) -> Vec<TextEdit> {
    let mut edits = vec![TextEdit::replace(plan.replace, render(ctx, plan))];
    edits.extend(plan.extra.iter().cloned());
    edits
}

pub fn fix(ctx: &Context<'_>, plan: &RewritePlan, kind: FixKind, description: &str) -> Fix {
    Fix::new(kind, description, edits(ctx, plan))
}

fn render_body(ctx: &Context<'_>, arm: &PlannedArm, arm_indent: &str, body_indent: &str, out: &mut String) {
    let src = ctx.source;
    match &arm.body {
        ArmBody::Empty => {
            if arm.orphans.is_empty() && arm.trailing.is_empty() {
                out.push_str(" {}");
                return;
            }
            out.push_str(" {");
            push_comment_lines(out, arm.orphans.iter().chain(&arm.trailing), body_indent);
            close_block(out, arm_indent);
        }
        ArmBody::Inline(span) | ArmBody::Value(span) => {
            let from = indent_at(src, span.start);
            if arm.orphans.is_empty() {
                out.push(' ');
                out.push_str(&reindent(span.text(src), from, arm_indent));
            } else {
                push_comment_lines(out, &arm.orphans, body_indent);
                out.push('\n');
                out.push_str(body_indent);
                out.push_str(&reindent(span.text(src), from, body_indent));
            }
            if matches!(arm.body, ArmBody::Value(_)) {
                out.push(';');
            }
            push_comment_lines(out, &arm.trailing, body_indent);
        }
        ArmBody::Braced(span) => {
            let text = reindent(span.text(src), indent_at(src, span.start), arm_indent);
            let inner = text
                .strip_prefix('{')
                .and_then(|t| t.strip_suffix('}'))
                .unwrap_or(&text)
                .trim_end();
            out.push_str(" {");
            push_comment_lines(out, &arm.orphans, body_indent);
            let mut multiline = !arm.orphans.is_empty() || !arm.trailing.is_empty() || inner.starts_with('\n');
            if !inner.trim().is_empty() {
                if inner.starts_with('\n') || !multiline {
                    out.push_str(inner);
                } else {
                    out.push('\n');
                    out.push_str(body_indent);
                    out.push_str(inner.trim_start());
                }
            }
            push_comment_lines(out, &arm.trailing, body_indent);
            if inner.trim().is_empty() && arm.orphans.is_empty() && arm.trailing.is_empty() {
                multiline = false;
            }
            if multiline {
                close_block(out, arm_indent);
            } else if inner.trim().is_empty() {
                out.push('}');
            } else {
                out.push_str(" }");
            }
        }
        ArmBody::Statements { stmts, yield_value } => {
            out.push_str(" {");
            push_comment_lines(out, &arm.orphans, body_indent);
            if let Some(span) = stmts {
                out.push('\n');
                out.push_str(body_indent);
                out.push_str(&reindent(span.text(src), indent_at(src, span.start), body_indent));
            }
            if let Some(value) = yield_value {
                out.push('\n');
                out.push_str(body_indent);
                out.push_str("yield ");
                out.push_str(&reindent(value.text(src), indent_at(src, value.start), body_indent));
                out.push(';');
            }
            push_comment_lines(out, &arm.trailing, body_indent);
            close_block(out, arm_indent);
        }
    }
}

fn close_block(out: &mut String, indent: &str) {
    out.push('\n');
    out.push_str(indent);
    out.push('}');
}

fn push_comment_lines<'s>(out: &mut String, comments: impl IntoIterator<Item = &'s String>, indent: &str) {
    for comment in comments {
        out.push('\n');
        push_comment(out, comment, indent);
    }
}

/// Write a possibly multi-line comment at `indent`; continuation lines of
/// a block comment keep their ` *` alignment.
fn push_comment(out: &mut String, text: &str, indent: &str) {
    for (i, line) in text.lines().enumerate() {
        let line = line.trim_start();
        if i > 0 {
            out.push('\n');
        }
        out.push_str(indent);
        if i > 0 && line.starts_with('*') {
            out.push(' ');
        }
        out.push_str(line);
    }
}
