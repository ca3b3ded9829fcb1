//! Values handed between the passes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// keywords of the script dialect
pub const IMPORT_KEYWORD: &str = "import ";
pub const GLOBAL_KEYWORD: &str = "global ";
pub const FUNCTION_KEYWORD: &str = "func ";
pub const STRUCT_KEYWORD: &str = "struct ";

/// Extension of script files accepted by the driver.
pub const SCRIPT_EXTENSION: &str = "auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Import,
    GlobalVar,
    BuiltinFunction,
    StructField,
}

/// A named piece of declaration text, from the user script or the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationItem {
    pub name: String,
    pub text: String,
    pub kind: DeclarationKind,
}

impl DeclarationItem {
    pub fn new(name: impl Into<String>, text: impl Into<String>, kind: DeclarationKind) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            kind,
        }
    }
}

/// One builtin function of the catalog. Overloads share a single entry whose
/// body holds every variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub body: String,
}

/// A function declared by the user with `func`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub name: String,
    pub body: String,
}

/// A user `struct`, one auxiliary unit once extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructRecord {
    pub name: String,
    pub fields: Vec<String>,
}

/// Immediately-after-decompose representation of one script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecomposedScript {
    pub imports: Vec<DeclarationItem>,
    pub globals: Vec<DeclarationItem>,
    pub functions: Vec<FunctionRecord>,
    /// Residual statements, already indented for the entry point.
    pub entry_body: String,
}

// ─────────────────────────────────────────────────────
// Generated unit
// ─────────────────────────────────────────────────────

/// Named placeholders of the generated unit, in template order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    CatalogImports,
    UserImports,
    ClassHeader,
    CatalogDeclarations,
    UserGlobals,
    EntryPoint,
    UserFunctions,
    BuiltinFunctions,
    ClassFooter,
}

impl Slot {
    pub const TEMPLATE: [Slot; 9] = [
        Slot::CatalogImports,
        Slot::UserImports,
        Slot::ClassHeader,
        Slot::CatalogDeclarations,
        Slot::UserGlobals,
        Slot::EntryPoint,
        Slot::UserFunctions,
        Slot::BuiltinFunctions,
        Slot::ClassFooter,
    ];
}

/// The program being generated. Unfilled slots render as nothing, so the
/// rendered text doubles as the skeleton searched by the closure passes.
#[derive(Debug, Clone, Default)]
pub struct GeneratedUnit {
    slots: HashMap<Slot, String>,
}

impl GeneratedUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill(&mut self, slot: Slot, text: impl Into<String>) {
        self.slots.insert(slot, text.into());
    }

    pub fn append(&mut self, slot: Slot, text: &str) {
        let current = self.slots.entry(slot).or_default();
        if !current.is_empty() && !current.ends_with('\n') {
            current.push('\n');
        }
        current.push_str(text);
    }

    pub fn get(&self, slot: Slot) -> &str {
        self.slots.get(&slot).map_or("", String::as_str)
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for slot in Slot::TEMPLATE {
            let text = self.get(slot);
            if text.is_empty() {
                continue;
            }
            out.push_str(text);
            if !text.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

/// A compilation unit split off the main one (one per struct).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryUnit {
    pub name: String,
    pub source: String,
}

/// Fully transpiled script handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspiledProgram {
    pub class_name: String,
    pub source: String,
    pub auxiliary: Vec<AuxiliaryUnit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_follows_template_order() {
        let mut unit = GeneratedUnit::new();
        unit.fill(Slot::ClassFooter, "}");
        unit.fill(Slot::ClassHeader, "public class Demo {");
        unit.fill(Slot::UserImports, "import java.util.List;");
        unit.append(Slot::BuiltinFunctions, "\tpublic static void a() {}");
        unit.append(Slot::BuiltinFunctions, "\tpublic static void b() {}");

        assert_eq!(
            unit.render(),
            "import java.util.List;\npublic class Demo {\n\tpublic static void a() {}\n\tpublic static void b() {}\n}\n"
        );
        assert_eq!(unit.get(Slot::EntryPoint), "");
    }
}
