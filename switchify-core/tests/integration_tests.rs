//! End-to-end tests: parse Java, run the rules, apply a fix, compare text.

use std::fs;

use switchify_core::{
    analyze_file, analyze_source, apply_edits, apply_fixes_to_files, format_reports, FileFixes, FileReport, FixKind,
    OutputFormat, OutputOptions, RefactorConfig, Rule,
};

fn analyze(source: &str, config: &RefactorConfig) -> FileReport {
    analyze_source(source.to_string(), "Test.java".to_string(), config).expect("Should analyze")
}

/// Apply fix `index` of the only finding.
fn rewrite(source: &str, config: &RefactorConfig, index: usize) -> String {
    let report = analyze(source, config);
    assert_eq!(report.findings.len(), 1, "expected one finding, got {:?}", report.findings);
    let fix = &report.findings[0].fixes[index];
    apply_edits(source, &fix.edits).expect("Should apply")
}

fn if_chain_config() -> RefactorConfig {
    let mut config = RefactorConfig::default();
    config.if_chain.enable_main = true;
    config
}

const ENUM_CHAIN: &str = r#"class Shapes {
  enum Kind { CIRCLE, SQUARE, TRIANGLE }

  void draw(Kind kind) {
    if (kind == Kind.CIRCLE) {
      circle();
    } else if (kind == Kind.SQUARE) {
      square();
    } else if (kind == Kind.TRIANGLE) {
      triangle();
    }
  }
}
"#;

#[test]
fn test_enum_chain_to_switch() {
    let text = rewrite(ENUM_CHAIN, &if_chain_config(), 0);
    assert_eq!(
        text,
        r#"class Shapes {
  enum Kind { CIRCLE, SQUARE, TRIANGLE }

  void draw(Kind kind) {
    switch (kind) {
      case CIRCLE -> circle();
      case SQUARE -> square();
      case TRIANGLE -> triangle();
    }
  }
}
"#
    );
}

#[test]
fn test_rewrite_is_idempotent() {
    let config = if_chain_config();
    let text = rewrite(ENUM_CHAIN, &config, 0);
    let again = analyze(&text, &config);
    assert!(again.findings.iter().all(|f| f.rule != Rule::IfChainToSwitch));
}

#[test]
fn test_disabled_configuration_finds_nothing() {
    let report = analyze(ENUM_CHAIN, &RefactorConfig::default());
    assert!(report.findings.is_empty());
}

#[test]
fn test_type_chain_uses_unused_binding() {
    let source = r#"class Printer {
  void print(Object value) {
    if (value instanceof String s) {
      text(s);
    } else if (value instanceof Integer) {
      number();
    } else if (value instanceof Boolean b) {
      flag(b);
    } else {
      other();
    }
  }
}
"#;
    let text = rewrite(source, &if_chain_config(), 0);
    assert!(text.contains("    switch (value) {\n"));
    assert!(text.contains("      case String s -> text(s);\n"));
    assert!(text.contains("      case Integer unused -> number();\n"));
    assert!(text.contains("      case Boolean b -> flag(b);\n"));
    assert!(text.contains("      default -> other();\n"));
}

#[test]
fn test_comments_in_branches_are_kept() {
    let source = r#"class Router {
  void route(int code) {
    if (code == 200) {
      // success
      ok();
      ok();
    } else if (code == 404) {
      missing();
    } else if (code == 500) {
      failed();
    }
  }
}
"#;
    let text = rewrite(source, &if_chain_config(), 0);
    assert!(text.contains("switch (code) {"));
    assert!(text.contains("// success"));
}

#[test]
fn test_duplicate_tests_are_rejected() {
    let source = r#"class Dup {
  void m(int i) {
    if (i == 1) {
      a();
    } else if (i == 2) {
      b();
    } else if (i == 1) {
      c();
    }
  }
}
"#;
    assert!(analyze(source, &RefactorConfig::all_enabled()).findings.is_empty());
}

#[test]
fn test_dominated_pattern_is_reordered() {
    let source = r#"class Order {
  void m(Object x) {
    if (x instanceof Object) {
      a();
    } else if (x instanceof Number n) {
      b(n);
    } else if (x instanceof String s) {
      c(s);
    }
  }
}
"#;
    let text = rewrite(source, &if_chain_config(), 0);
    let number = text.find("case Number n").expect("Should have Number arm");
    let object = text.find("case Object").expect("Should have Object arm");
    assert!(number < object);
}

#[test]
fn test_trailing_return_pulled_up_only_when_exhaustive() {
    let enum_source = r#"class Pull {
  enum C { R, G, B }
  int m(C c) {
    if (c == C.R) {
      return 1;
    } else if (c == C.G) {
      return 2;
    } else if (c == C.B) {
      return 3;
    }
    return -1;
  }
}
"#;
    let text = rewrite(enum_source, &if_chain_config(), 0);
    assert!(text.contains("      default -> {\n        return -1;\n      }\n"));

    let int_source = enum_source
        .replace("C c)", "int c)")
        .replace("C.R", "1")
        .replace("C.G", "2")
        .replace("C.B", "3");
    let text = rewrite(&int_source, &if_chain_config(), 0);
    assert!(text.contains("      default -> {}\n    }\n    return -1;\n"));
}

#[test]
fn test_assignment_switch_merges_adjacent_declaration() {
    let source = r#"class Assign {
  int m(int i) {
    int x;
    if (i == 1) {
      x = 10;
    } else if (i == 2) {
      x = 20;
    } else if (i == 3) {
      x = 30;
    } else {
      x = 40;
    }
    return x;
  }
}
"#;
    let mut config = if_chain_config();
    config.if_chain.enable_assignment_switch = true;
    let report = analyze(source, &config);
    let fix = report.findings[0]
        .fixes
        .iter()
        .find(|f| f.description == "Convert if-chain to assignment switch")
        .expect("Should offer assignment switch");
    let text = apply_edits(source, &fix.edits).expect("Should apply");
    assert!(text.contains(
        "    int x = switch (i) {\n      case 1 -> 10;\n      case 2 -> 20;\n      case 3 -> 30;\n      default -> 40;\n    };\n    return x;\n"
    ));
    assert!(!text.contains("int x;"));
}

#[test]
fn test_assignment_switch_keeps_distant_declaration() {
    let source = r#"class Assign {
  int m(int i) {
    int x;
    log();
    if (i == 1) {
      x = 10;
    } else if (i == 2) {
      x = 20;
    } else if (i == 3) {
      x = 30;
    } else {
      x = 40;
    }
    return x;
  }
}
"#;
    let mut config = if_chain_config();
    config.if_chain.enable_assignment_switch = true;
    let report = analyze(source, &config);
    let fix = report.findings[0]
        .fixes
        .iter()
        .find(|f| f.description == "Convert if-chain to assignment switch")
        .expect("Should offer assignment switch");
    let text = apply_edits(source, &fix.edits).expect("Should apply");
    assert!(text.contains("    int x;\n    log();\n    x = switch (i) {\n"));
}

#[test]
fn test_colon_switch_to_arrow_switch() {
    let source = r#"class Colon {
  void m(int i) {
    switch (i) {
      case 1:
        a();
        break;
      case 2:
      case 3:
        b();
        break;
      default:
        c();
    }
  }
}
"#;
    let mut config = RefactorConfig::default();
    config.statement_switch.enable_direct_conversion = true;
    let text = rewrite(source, &config, 0);
    assert!(text.contains("      case 1 -> a();\n      case 2, 3 -> b();\n      default -> c();\n"));
    assert!(!text.contains("break;"));
}

#[test]
fn test_arrow_switch_to_return_switch() {
    let source = r#"class Arrow {
  int m(int i) {
    switch (i) {
      case 1 -> {
        return 10;
      }
      default -> {
        return 0;
      }
    }
  }
}
"#;
    let mut config = RefactorConfig::default();
    config.refactor_switch.enable_return_switch = true;
    let text = rewrite(source, &config, 0);
    assert!(text.contains("    return switch (i) {\n"));
    assert!(text.contains("      case 1 -> 10;\n"));
    assert!(text.contains("      default -> 0;\n"));
    assert!(text.contains("    };\n"));
}

#[test]
fn test_simplify_arrow_switch_body() {
    let source = r#"class Simplify {
  void m(int i) {
    switch (i) {
      case 1 -> {
        a();
      }
      default -> {
        b();
      }
    }
  }
}
"#;
    let mut config = RefactorConfig::default();
    config.refactor_switch.enable_simplify_switch = true;
    let text = rewrite(source, &config, 0);
    assert!(text.contains("      case 1 -> a();\n"));
    assert!(text.contains("      default -> b();\n"));
}

#[test]
fn test_secondary_fix_drops_redundant_default() {
    let source = r#"class Secondary {
  enum C { R, G }
  int m(C c) {
    int x;
    switch (c) {
      case R:
        x = 1;
        break;
      case G:
        x = 2;
        break;
      default:
        throw new IllegalArgumentException();
    }
    return x;
  }
}
"#;
    let mut config = RefactorConfig::default();
    config.statement_switch.enable_assignment_switch_conversion = true;
    let report = analyze(source, &config);
    let fix = report.findings[0].chosen_fix(true).expect("Should have fix");
    assert_eq!(fix.kind, FixKind::Secondary);
    let text = apply_edits(source, &fix.edits).expect("Should apply");
    assert!(text.contains("    int x = switch (c) {\n"));
    assert!(!text.contains("default"));
}

#[test]
fn test_json_report() {
    let report = analyze(ENUM_CHAIN, &if_chain_config());
    let output = format_reports(&[report], OutputFormat::Json, &OutputOptions::default());
    let value: serde_json::Value = serde_json::from_str(&output).expect("Should be valid JSON");
    assert_eq!(value[0]["rule"], "IfChainToSwitch");
    assert_eq!(value[0]["line"], 5);
    assert_eq!(value[0]["file"], "Test.java");
}

#[test]
fn test_apply_fixes_to_file() {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let path = dir.path().join("Shapes.java");
    fs::write(&path, ENUM_CHAIN).expect("Should write source");

    let report = analyze_file(&path, &if_chain_config()).expect("Should analyze");
    let files = vec![FileFixes {
        path: &report.file,
        source: &report.source,
        fixes: report.chosen_fixes(false),
    }];
    let summary = apply_fixes_to_files(&files).expect("Should apply");
    assert_eq!(summary.files_modified, 1);
    assert_eq!(summary.fixes_applied, 1);

    let written = fs::read_to_string(&path).expect("Should read back");
    assert!(written.contains("      case CIRCLE -> circle();\n"));
}

#[test]
fn test_comment_before_else_if_moves_to_case() {
    let source = r#"class Router {
  void route(int code) {
    if (code == 200) {
      ok();
    }
    // not found
    else if (code == 404) {
      missing();
    } else if (code == 500) {
      failed();
    }
  }
}
"#;
    let text = rewrite(source, &if_chain_config(), 0);
    assert!(text.contains("      case 200 -> ok();\n      // not found\n      case 404 -> missing();\n"));
    assert!(!text.contains("else"));
}

#[test]
fn test_only_assignment_form_drops_default() {
    let source = r#"class Secondary {
  enum C { R, G }
  int m(C c) {
    int x;
    switch (c) {
      case R:
        x = 1;
        break;
      case G:
        x = 2;
        break;
      default:
        throw new IllegalArgumentException();
    }
    return x;
  }
}
"#;
    let mut config = RefactorConfig::default();
    config.statement_switch.enable_direct_conversion = true;
    config.statement_switch.enable_assignment_switch_conversion = true;
    let report = analyze(source, &config);
    assert_eq!(report.findings.len(), 1);
    let fixes = &report.findings[0].fixes;
    assert_eq!(fixes.iter().filter(|f| f.kind == FixKind::Primary).count(), 2);
    let secondary: Vec<_> = fixes.iter().filter(|f| f.kind == FixKind::Secondary).collect();
    assert_eq!(secondary.len(), 1);
    let text = apply_edits(source, &secondary[0].edits).expect("Should apply");
    assert!(text.contains("    int x = switch (c) {\n"));

    config.statement_switch.enable_assignment_switch_conversion = false;
    let report = analyze(source, &config);
    assert!(report.findings[0].fixes.iter().all(|f| f.kind == FixKind::Primary));
}

#[test]
fn test_declaration_not_merged_when_unsafe() {
    let template = r#"class Assign {
  int m(int i) {
    DECL
    if (i == 1) {
      x = 10;
    } else if (i == 2) {
      x = 20;
    } else if (i == 3) {
      x = 30;
    } else {
      x = 40;
    }
    return x;
  }
}
"#;
    let mut config = if_chain_config();
    config.if_chain.enable_assignment_switch = true;
    for decl in ["int x = compute();", "volatile int x;"] {
        let source = template.replace("DECL", decl);
        let report = analyze(&source, &config);
        let fix = report.findings[0]
            .fixes
            .iter()
            .find(|f| f.description == "Convert if-chain to assignment switch")
            .expect("Should offer assignment switch");
        let text = apply_edits(&source, &fix.edits).expect("Should apply");
        assert!(text.contains(&format!("    {}\n    x = switch (i) {{\n", decl)), "{}", text);
    }
}

#[test]
fn test_explicit_null_in_pattern_chain() {
    let source = r#"class Nulls {
  void m(Object o) {
    if (o == null) {
      none();
    } else if (o instanceof String s) {
      text(s);
    } else if (o instanceof Integer i) {
      number(i);
    } else {
      other();
    }
  }
}
"#;
    let text = rewrite(source, &if_chain_config(), 0);
    assert!(text.contains(
        "      case null -> none();\n      case String s -> text(s);\n      case Integer i -> number(i);\n      default -> other();\n"
    ));
}

#[test]
fn test_boxed_constants_null_folded_into_default_in_safe_mode() {
    let source = r#"class Boxed {
  void m(Integer n) {
    if (n == 1) {
      one();
    } else if (n == 2) {
      two();
    } else if (n == 3) {
      three();
    } else {
      other();
    }
  }
}
"#;
    let text = rewrite(source, &if_chain_config(), 0);
    assert!(text.contains("      default -> other();\n"));
    assert!(!text.contains("case null"));

    let mut config = if_chain_config();
    config.if_chain.enable_safe = true;
    let text = rewrite(source, &config, 0);
    assert!(text.contains("      case null, default -> other();\n"));
}

#[test]
fn test_switch_expression_inside_switch_is_skipped() {
    let nested = r#"class Nested {
  void m(int i, int j) {
    switch (j) {
      case 1 -> {
        int v = switch (i) {
          case 1 -> {
            yield 10;
          }
          default -> 0;
        };
        use(v);
      }
      default -> {}
    }
  }
}
"#;
    let mut config = RefactorConfig::default();
    config.refactor_switch.enable_simplify_switch = true;
    assert!(analyze(nested, &config).findings.is_empty());

    let top_level = r#"class Nested {
  int m(int i) {
    int v = switch (i) {
      case 1 -> {
        yield 10;
      }
      default -> 0;
    };
    return v;
  }
}
"#;
    let text = rewrite(top_level, &config, 0);
    assert!(text.contains("      case 1 -> 10;\n"));
}
