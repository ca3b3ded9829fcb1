//! `struct Name { T a; U b; }` becomes its own compilation unit,
//! `public class Name { public T a; public U b; }`.

use super::assemble::select_imports;
use super::format::skip_whitespace;
use super::lexer::{self, IgnoreIndex};
use crate::error::Diagnostic;
use crate::model::{AuxiliaryUnit, GeneratedUnit, STRUCT_KEYWORD, Slot, StructRecord};

/// A struct found in the entry point, with the byte range it occupies.
struct Extracted {
    record: StructRecord,
    start: usize,
    end: usize,
}

/// Slots user code lands in, and so the only ones a struct can be declared in.
const USER_CODE_SLOTS: [Slot; 2] = [Slot::EntryPoint, Slot::UserFunctions];

/// Take every struct out of the unit's user code. `source` is the user
/// script, used to point diagnostics at the declaring line.
pub fn split_structs(
    unit: &mut GeneratedUnit,
    class_name: &str,
    source: &str,
) -> Result<Vec<StructRecord>, Diagnostic> {
    let mut records: Vec<StructRecord> = Vec::new();

    for slot in USER_CODE_SLOTS {
        let mut text = unit.get(slot).to_string();
        while let Some(Extracted { record, start, end }) = next_struct(&text, source)? {
            let lines = declaration_lines(source, &record.name);
            if records.iter().any(|r| r.name == record.name) {
                let line = lines.get(1).or(lines.first()).copied().unwrap_or_default();
                return Err(Diagnostic::collision(
                    line,
                    format!("struct \"{}\" is declared twice.", record.name),
                ));
            }
            if record.name == class_name {
                return Err(Diagnostic::collision(
                    lines.first().copied().unwrap_or_default(),
                    format!("Cannot override \"{}\", use a different name.", record.name),
                ));
            }
            tracing::trace!(name = %record.name, fields = record.fields.len(), ?slot, "struct extracted");
            text.replace_range(start..end, "");
            records.push(record);
        }
        unit.fill(slot, text);
    }

    tracing::debug!(structs = records.len(), "structs split");
    Ok(records)
}

/// Java source for one struct. `imports` is the pool of import lines it may
/// need; only those it mentions are kept.
pub fn render_struct(record: &StructRecord, imports: &[String]) -> AuxiliaryUnit {
    let mut body = format!("public class {} {{\n", record.name);
    for field in &record.fields {
        body.push_str(&format!("\tpublic {field};\n"));
    }
    body.push_str("}\n");

    let mut source = String::new();
    for line in select_imports(&body, imports) {
        source.push_str(line);
        source.push('\n');
    }
    source.push_str(&body);
    AuxiliaryUnit {
        name: record.name.clone(),
        source,
    }
}

/// Lines (1-based) of `source` declaring `struct <name>`.
pub fn declaration_lines(source: &str, name: &str) -> Vec<usize> {
    lexer::strip_comments(source)
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            line.trim()
                .strip_prefix(STRUCT_KEYWORD)
                .and_then(|rest| rest.split_whitespace().next())
                .is_some_and(|token| token.trim_end_matches('{') == name)
        })
        .map(|(n, _)| n + 1)
        .collect()
}

fn next_struct(text: &str, source: &str) -> Result<Option<Extracted>, Diagnostic> {
    let index = IgnoreIndex::scan(text);
    for start in lexer::line_starts(text) {
        let line = &text[start..lexer::line_bounds(text, start).1];
        let keyword_at = start + (line.len() - line.trim_start().len());
        if !text[keyword_at..].starts_with(STRUCT_KEYWORD) || index.is_ignored(keyword_at) {
            continue;
        }

        let name_start = skip_whitespace(text, keyword_at + STRUCT_KEYWORD.len());
        let name_len = text[name_start..]
            .bytes()
            .take_while(|&b| lexer::is_ident_byte(b))
            .count();
        let name = &text[name_start..name_start + name_len];
        let line_no = declaration_lines(source, name).first().copied().unwrap_or_default();
        if name.is_empty() {
            return Err(Diagnostic::imbalance(line_no, "Expected a name after struct."));
        }

        let open = skip_whitespace(text, name_start + name_len);
        if text.as_bytes().get(open) != Some(&b'{') {
            return Err(Diagnostic::imbalance(
                line_no,
                format!("Expected '{{' after struct {name}."),
            ));
        }
        let close = lexer::find_matching(text, &index, open, b'{', b'}')
            .ok_or_else(|| Diagnostic::imbalance(line_no, "Expected corresponding '}'"))?;

        let record = StructRecord {
            name: name.to_string(),
            fields: fields(&text[open + 1..close]),
        };
        return Ok(Some(Extracted {
            record,
            start: keyword_at,
            end: close + 1,
        }));
    }
    Ok(None)
}

/// `T a; U b;` over any number of lines, one field per `;`.
fn fields(body: &str) -> Vec<String> {
    let joined = lexer::strip_comments(body)
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ");
    joined
        .split(';')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn unit_with_entry(entry: &str) -> GeneratedUnit {
        let mut unit = GeneratedUnit::new();
        unit.fill(Slot::EntryPoint, entry);
        unit
    }

    #[test]
    fn test_split_is_exhaustive() {
        let source = "struct Point {\n    int x;\n    int y;\n}\nstruct Named { String name; java.util.List<String> tags; }\nPoint p = new Point();\n";
        let entry = "\tpublic static void main(String[] args) {\n\t\tstruct Point {\n\t\tint x;\n\t\tint y;\n\t\t}\n\t\tstruct Named { String name; java.util.List<String> tags; }\n\t\tPoint p = new Point();\n\t}";
        let mut unit = unit_with_entry(entry);

        let records = split_structs(&mut unit, "Shapes", source).unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Point", "Named"]);
        assert_eq!(records[0].fields, vec!["int x", "int y"]);
        assert_eq!(records[1].fields, vec!["String name", "java.util.List<String> tags"]);

        let remaining = unit.get(Slot::EntryPoint);
        assert!(!remaining.lines().any(|l| l.trim().starts_with(STRUCT_KEYWORD)));
        assert!(remaining.contains("Point p = new Point();"));
    }

    #[test]
    fn test_struct_inside_function_is_split() {
        let source = "func void f() {\n    struct Pair { int a; int b; }\n    Pair p = new Pair();\n}\nstruct Top { int c; }\nf();\n";
        let mut unit = unit_with_entry("\tpublic static void main(String[] args) {\n\t\tstruct Top { int c; }\n\t\tf();\n\t}");
        unit.fill(
            Slot::UserFunctions,
            "\tpublic static void f() {\n\t\tstruct Pair { int a; int b; }\n\t\tPair p = new Pair();\n\t}",
        );

        let records = split_structs(&mut unit, "Demo", source).unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Top", "Pair"]);
        assert_eq!(records[1].fields, vec!["int a", "int b"]);
        assert!(!unit.render().lines().any(|l| l.trim().starts_with(STRUCT_KEYWORD)));
        assert!(unit.get(Slot::UserFunctions).contains("Pair p = new Pair();"));
    }

    #[test]
    fn test_render_struct() {
        let record = StructRecord {
            name: "Target".into(),
            fields: vec!["Robot robot".into(), "int x".into()],
        };
        let imports = vec!["import java.awt.Robot;".to_string(), "import java.io.File;".to_string()];
        let unit = render_struct(&record, &imports);
        assert_eq!(
            unit.source,
            "import java.awt.Robot;\npublic class Target {\n\tpublic Robot robot;\n\tpublic int x;\n}\n"
        );
    }

    #[test]
    fn test_struct_errors() {
        let test_cases = vec![
            ("x();\nstruct Twin { int a; }\nstruct Twin { int b; }\n", "Main", 3, ErrorKind::NameCollision),
            ("struct Main { int a; }\n", "Main", 1, ErrorKind::NameCollision),
            ("y();\nstruct Broken int a;\n", "Main", 2, ErrorKind::StructuralImbalance),
        ];
        for (source, class_name, line, kind) in test_cases {
            let entry = crate::processor::decompose::indent(source, 2);
            let mut unit = unit_with_entry(&entry);
            let err = split_structs(&mut unit, class_name, source).unwrap_err();
            assert_eq!((err.line, err.kind), (line, kind), "splitting {source:?}");
        }
    }

    #[test]
    fn test_declaration_lines() {
        let source = "// struct Point {\nstruct Point {\n}\nstruct Pointy{\n}\nstruct Point{ int a; }";
        assert_eq!(declaration_lines(source, "Point"), vec![2, 6]);
        assert_eq!(declaration_lines(source, "Pointy"), vec![4]);
    }
}
