//! Fill the program template and pull in the library pieces it needs.
//!
//! The rendered unit is the skeleton. A library function or declaration is
//! copied in when its name appears as a standalone identifier (outside
//! comments and literals) of the skeleton or of anything already copied in.
//! Library imports are decided last, against the finished text.

use std::collections::{HashMap, HashSet};

use super::decompose::indent;
use super::lexer::{self, IgnoreIndex};
use crate::catalog::{Catalog, imported_class, make_static};
use crate::model::{DecomposedScript, GeneratedUnit, IMPORT_KEYWORD, Slot};

/// Assembled unit plus what the closure decided, in inclusion order.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub unit: GeneratedUnit,
    pub builtins: Vec<String>,
    pub declarations: Vec<String>,
    pub imports: Vec<String>,
}

pub fn assemble(script: &DecomposedScript, class_name: &str, catalog: &dyn Catalog) -> Assembly {
    let mut unit = seed(script, class_name);

    let closure = Closure::new(catalog).run(&unit.render());
    for body in &closure.function_bodies {
        unit.append(Slot::BuiltinFunctions, body);
    }
    for text in &closure.declaration_texts {
        unit.append(Slot::CatalogDeclarations, text);
    }

    let imports: Vec<String> = select_imports(&unit.render(), catalog.imports())
        .into_iter()
        .map(str::to_string)
        .collect();
    unit.fill(Slot::CatalogImports, imports.join("\n"));

    tracing::debug!(
        builtins = closure.function_names.len(),
        declarations = closure.declaration_names.len(),
        imports = imports.len(),
        "library closure computed"
    );
    Assembly {
        unit,
        builtins: closure.function_names,
        declarations: closure.declaration_names,
        imports,
    }
}

/// User content only; library slots start empty.
fn seed(script: &DecomposedScript, class_name: &str) -> GeneratedUnit {
    let mut unit = GeneratedUnit::new();
    let imports: Vec<&str> = script.imports.iter().map(|i| i.text.as_str()).collect();
    let globals: Vec<&str> = script.globals.iter().map(|g| g.text.as_str()).collect();
    let functions: Vec<&str> = script.functions.iter().map(|f| f.body.as_str()).collect();

    unit.fill(Slot::UserImports, imports.join("\n"));
    unit.fill(Slot::ClassHeader, format!("public class {class_name} {{"));
    unit.fill(Slot::UserGlobals, indent(&globals.join("\n"), 1));
    let mut entry = String::from("\tpublic static void main(String[] args) {\n");
    if !script.entry_body.is_empty() {
        entry.push_str(&script.entry_body);
        entry.push('\n');
    }
    entry.push_str("\t}");
    unit.fill(Slot::EntryPoint, entry);
    unit.fill(Slot::UserFunctions, indent(&functions.join("\n\n"), 1));
    unit.fill(Slot::ClassFooter, "}");
    unit
}

/// The import lines among `candidates` whose class is mentioned in `text`,
/// import lines themselves not counted. Wildcard imports always pass.
pub fn select_imports<'a>(text: &str, candidates: &'a [String]) -> Vec<&'a str> {
    let body: String = text
        .lines()
        .filter(|line| !line.trim_start().starts_with(IMPORT_KEYWORD))
        .collect::<Vec<_>>()
        .join("\n");
    let mentioned = mentions(&body);
    candidates
        .iter()
        .map(String::as_str)
        .filter(|line| match imported_class(line) {
            Some("*") => true,
            Some(class) => mentioned.contains(class),
            None => false,
        })
        .collect()
}

/// Standalone identifiers of `text` outside comments and literals.
pub fn mentions(text: &str) -> HashSet<&str> {
    let index = IgnoreIndex::scan(text);
    lexer::identifiers(text, &index)
        .into_iter()
        .map(|(_, ident)| ident)
        .collect()
}

// ─────────────────────────────────────────────────────
// Mention closure
// ─────────────────────────────────────────────────────

/// A library entry waiting to be looked at.
enum Pending {
    Function(usize),
    Declaration(usize),
}

struct Closure<'c> {
    catalog: &'c dyn Catalog,
    functions: HashMap<&'c str, usize>,
    declarations: HashMap<&'c str, usize>,
    included_functions: HashSet<usize>,
    included_declarations: HashSet<usize>,

    function_names: Vec<String>,
    function_bodies: Vec<String>,
    declaration_names: Vec<String>,
    declaration_texts: Vec<String>,
}

impl<'c> Closure<'c> {
    fn new(catalog: &'c dyn Catalog) -> Self {
        let functions = catalog
            .functions()
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.as_str(), i))
            .collect();
        let declarations = catalog
            .declarations()
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.as_str(), i))
            .collect();
        Self {
            catalog,
            functions,
            declarations,
            included_functions: HashSet::new(),
            included_declarations: HashSet::new(),
            function_names: Vec::new(),
            function_bodies: Vec::new(),
            declaration_names: Vec::new(),
            declaration_texts: Vec::new(),
        }
    }

    /// Worklist until no new entry is mentioned by anything included so far.
    fn run(mut self, skeleton: &str) -> Self {
        let catalog = self.catalog;
        let mut worklist = self.discover(skeleton);
        while let Some(next) = worklist.pop() {
            let text = match next {
                Pending::Function(i) => {
                    let entry = &catalog.functions()[i];
                    let body = lexer::strip_comments(&entry.body);
                    tracing::trace!(builtin = %entry.name, "included");
                    self.function_names.push(entry.name.clone());
                    self.function_bodies.push(drop_blank_lines(&body));
                    body
                }
                Pending::Declaration(i) => {
                    let item = &catalog.declarations()[i];
                    let text = make_static(&lexer::strip_comments(&item.text));
                    tracing::trace!(declaration = %item.name, "included");
                    self.declaration_names.push(item.name.clone());
                    self.declaration_texts.push(text.clone());
                    text
                }
            };
            let found = self.discover(&text);
            worklist.extend(found);
        }
        self
    }

    /// Mark every not-yet-included entry named in `text`. Reversed, so the
    /// first mention is popped first.
    fn discover(&mut self, text: &str) -> Vec<Pending> {
        let index = IgnoreIndex::scan(text);
        let mut found = Vec::new();
        for (_, ident) in lexer::identifiers(text, &index) {
            if let Some(&i) = self.functions.get(ident) {
                if self.included_functions.insert(i) {
                    found.push(Pending::Function(i));
                }
            }
            if let Some(&i) = self.declarations.get(ident) {
                if self.included_declarations.insert(i) {
                    found.push(Pending::Declaration(i));
                }
            }
        }
        found.reverse();
        found
    }
}

fn drop_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LibraryCatalog;
    use crate::model::{CatalogEntry, DeclarationItem, DeclarationKind, FunctionRecord};

    fn entry(name: &str, body: &str) -> CatalogEntry {
        CatalogEntry {
            name: name.into(),
            body: body.into(),
        }
    }

    fn catalog() -> LibraryCatalog {
        LibraryCatalog::new(
            vec![
                entry("robot", "\tprivate static Robot robot() {\n\t\treturn new Robot();\n\t}"),
                entry("mouseDown", "\tpublic static void mouseDown(int b) {\n\t\trobot().mousePress(b);\n\t}"),
                entry("mouseUp", "\tpublic static void mouseUp(int b) {\n\t\trobot().mouseRelease(b);\n\t}"),
                entry(
                    "mouseClick",
                    "\tpublic static void mouseClick(int b) {\n\t\t// press then release\n\t\tmouseDown(b);\n\t\tsleep(clickDelay);\n\t\tmouseUp(b);\n\t}",
                ),
                entry("sleep", "\tpublic static void sleep(int ms) {\n\t}"),
                entry("fileRead", "\tpublic static String fileRead(String p) {\n\t\treturn new File(p).getName();\n\t}"),
                entry("getTime", "\tpublic static String getTime() {\n\t\treturn TIME_FORMAT;\n\t}"),
            ],
            vec![
                DeclarationItem::new("clickDelay", "private int clickDelay = 10;", DeclarationKind::GlobalVar),
                DeclarationItem::new("FILE_SEP", "public final String FILE_SEP = File.separator;", DeclarationKind::GlobalVar),
                DeclarationItem::new(
                    "TIME_FORMAT",
                    "public final String TIME_FORMAT = DEFAULT_FORMAT;",
                    DeclarationKind::GlobalVar,
                ),
                DeclarationItem::new("DEFAULT_FORMAT", "public final String DEFAULT_FORMAT = \"HH\";", DeclarationKind::GlobalVar),
            ],
            vec![
                "import java.awt.Robot;".to_string(),
                "import java.io.File;".to_string(),
                "import java.util.*;".to_string(),
            ],
        )
    }

    fn script(entry_body: &str) -> DecomposedScript {
        DecomposedScript {
            entry_body: indent(entry_body, 2),
            ..Default::default()
        }
    }

    #[test]
    fn test_click_only_closure() {
        let assembly = assemble(&script("mouseClick(1);"), "Clicker", &catalog());

        let mut builtins = assembly.builtins.clone();
        builtins.sort();
        assert_eq!(builtins, vec!["mouseClick", "mouseDown", "mouseUp", "robot", "sleep"]);
        assert_eq!(assembly.declarations, vec!["clickDelay"]);
        assert_eq!(
            assembly.imports,
            vec!["import java.awt.Robot;".to_string(), "import java.util.*;".to_string()]
        );

        let source = assembly.unit.render();
        assert!(!source.contains("fileRead"));
        assert!(!source.contains("press then release"));
        assert!(source.contains("\tprivate static int clickDelay = 10;"));
    }

    #[test]
    fn test_literals_and_comments_do_not_count() {
        let assembly = assemble(
            &script("print(\"fileRead\");\n// sleep(1);\nint mouseUpCount = 0;"),
            "Quiet",
            &catalog(),
        );
        assert!(assembly.builtins.is_empty());
        assert_eq!(assembly.imports, vec!["import java.util.*;".to_string()]);
    }

    #[test]
    fn test_declaration_pulls_declaration() {
        let assembly = assemble(&script("print(getTime());"), "Clock", &catalog());
        assert_eq!(assembly.builtins, vec!["getTime"]);
        assert_eq!(assembly.declarations, vec!["TIME_FORMAT", "DEFAULT_FORMAT"]);
    }

    #[test]
    fn test_template_order() {
        let decomposed = DecomposedScript {
            imports: vec![DeclarationItem::new(
                "List",
                "import java.util.List;",
                DeclarationKind::Import,
            )],
            globals: vec![DeclarationItem::new("x", "public static int x;", DeclarationKind::GlobalVar)],
            functions: vec![FunctionRecord {
                name: "twice".into(),
                body: "public static int twice(int n) {\n\treturn n * 2;\n}".into(),
            }],
            entry_body: indent("x = 5;\nsleep(twice(x));", 2),
        };
        let source = assemble(&decomposed, "Demo", &catalog()).unit.render();
        let expected = "import java.util.*;
import java.util.List;
public class Demo {
\tpublic static int x;
\tpublic static void main(String[] args) {
\t\tx = 5;
\t\tsleep(twice(x));
\t}
\tpublic static int twice(int n) {
\t\treturn n * 2;
\t}
\tpublic static void sleep(int ms) {
\t}
}
";
        assert_eq!(source, expected);
    }

    #[test]
    fn test_select_imports_ignores_import_lines() {
        let imports = vec!["import java.io.File;".to_string()];
        let text = "import java.io.File;\npublic class A {\n}";
        assert!(select_imports(text, &imports).is_empty());
        let text = "public class A {\n\tFile f;\n}";
        assert_eq!(select_imports(text, &imports), vec!["import java.io.File;"]);
    }
}
