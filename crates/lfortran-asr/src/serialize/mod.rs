//! Module-file persistence (§4.5): a typed byte stream that reloads a
//! `TranslationUnit`, with forward references resolved by two fixup walks
//! once the whole tree is back in the arena.
//!
//! Two concrete encodings share one logical format, chosen at compile time
//! via [`CompileOptions::encoding`](crate::config::CompileOptions::encoding):
//! a binary one packing integers as fixed-width big-endian bytes the same
//! way the teacher's `struct` module packs Python's `struct` format codes,
//! and a text one writing the same fields as space-separated decimal
//! numbers, for a module file a developer can diff by eye. A small header
//! (magic `b"ASRF"`, an encoding-flag byte, a `u32` producer version)
//! precedes the payload in both.

mod codec;
mod external;
mod reader;
mod writer;

use crate::asr::TranslationUnit;
use crate::error::SerializeError;

pub use external::{fix_external_symbols, fix_parent_symtab, ModuleTable};
pub use reader::{BinaryReader, Reader, TextReader};
pub use writer::{BinaryWriter, TextWriter, Writer};

const MAGIC: [u8; 4] = *b"ASRF";
const PRODUCER_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 1 + 4;

/// Selects the wire format [`dump`] writes; [`load`] instead reads it back
/// from the header, so a loader never needs to be told in advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Binary,
    Text,
}

/// Serializes `unit` into a self-contained module file.
#[must_use]
pub fn dump(unit: &TranslationUnit, encoding: Encoding) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(match encoding {
        Encoding::Binary => 0,
        Encoding::Text => 1,
    });
    out.extend_from_slice(&PRODUCER_VERSION.to_be_bytes());

    let mut writer: Box<dyn Writer> = match encoding {
        Encoding::Binary => Box::new(BinaryWriter::new()),
        Encoding::Text => Box::new(TextWriter::new()),
    };
    codec::write_tree(&mut *writer, unit);
    out.extend(writer.into_bytes());
    out
}

/// Reads a module file written by [`dump`], then runs `fix-parent-symtab`
/// and `fix-external-symbols` (§4.5). `modules` names every already-loaded
/// module an `ExternalSymbol` in this file may import from; its tables must
/// already live in the arena this call builds up -- merging a dependency's
/// module file into the consuming compilation's shared arena is left to the
/// caller, `load` only resolves names once both sides are co-resident.
pub fn load(
    bytes: &[u8],
    modules: &[ModuleTable<'_>],
    intrinsic_module_prefix: &str,
) -> Result<TranslationUnit, SerializeError> {
    if bytes.len() < HEADER_LEN {
        return Err(SerializeError::UnexpectedEof);
    }
    if bytes[0..4] != MAGIC {
        return Err(SerializeError::BadMagic);
    }
    // An unrecognized encoding flag means the header itself is corrupt or
    // from an encoding this producer never wrote; treated the same as a bad
    // magic rather than growing a third header-validation error variant.
    let encoding = match bytes[4] {
        0 => Encoding::Binary,
        1 => Encoding::Text,
        _ => return Err(SerializeError::BadMagic),
    };
    let version = u32::from_be_bytes(bytes[5..9].try_into().expect("slice of len 4"));
    if version > PRODUCER_VERSION {
        return Err(SerializeError::VersionMismatch { found: version, supported: PRODUCER_VERSION });
    }

    let payload = &bytes[HEADER_LEN..];
    let mut reader: Box<dyn Reader> = match encoding {
        Encoding::Binary => Box::new(BinaryReader::new(payload)),
        Encoding::Text => Box::new(TextReader::new(payload)),
    };
    let mut unit = codec::read_tree(&mut *reader)?;
    external::fix_parent_symtab(&mut unit);
    external::fix_external_symbols(&mut unit, modules, intrinsic_module_prefix)?;
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::{Abi, Access, Intent, ProgramSym, Storage, Symbol, Variable};
    use crate::symbol_table::SymbolTable;
    use crate::types::{Dimensions, Type};

    fn unit_with_one_program_and_variable() -> TranslationUnit {
        let mut unit = TranslationUnit::new();
        let table = unit
            .arena
            .tables
            .alloc(SymbolTable::new(Some(unit.global_table), None));
        let var = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "x".to_owned(),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: Type::Integer(4, Dimensions::new()),
            initializer: None,
            abi: Abi::Source,
            access: Access::Public,
        }));
        unit.arena.tables.get_mut(table).bind("x", var);
        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table,
            body: Vec::new(),
        }));
        unit.arena.tables.get_mut(table).owner = Some(program);
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);
        unit
    }

    #[test]
    fn binary_round_trip_preserves_program_and_variable() {
        let unit = unit_with_one_program_and_variable();
        let bytes = dump(&unit, Encoding::Binary);
        assert_eq!(&bytes[0..4], b"ASRF");

        let loaded = load(&bytes, &[], "__intrinsic_").unwrap();
        let program_id = loaded.arena.tables.get(loaded.global_table).get_local("main").unwrap();
        let Symbol::Program(program) = loaded.arena.symbols.get(program_id) else {
            panic!("expected a Program symbol");
        };
        assert_eq!(program.name, "main");
        let var_id = loaded.arena.tables.get(program.table).get_local("x").unwrap();
        let Symbol::Variable(var) = loaded.arena.symbols.get(var_id) else {
            panic!("expected a Variable symbol");
        };
        assert_eq!(var.name, "x");
        assert_eq!(var.ty, Type::Integer(4, Dimensions::new()));
        assert_eq!(loaded.arena.tables.get(program.table).parent, Some(loaded.global_table));
    }

    #[test]
    fn text_round_trip_matches_binary() {
        let unit = unit_with_one_program_and_variable();
        let bytes = dump(&unit, Encoding::Text);
        assert_eq!(&bytes[0..4], b"ASRF");
        assert_eq!(bytes[4], 1);

        let loaded = load(&bytes, &[], "__intrinsic_").unwrap();
        let program_id = loaded.arena.tables.get(loaded.global_table).get_local("main").unwrap();
        assert!(matches!(loaded.arena.symbols.get(program_id), Symbol::Program(_)));
    }

    #[test]
    fn rejects_bad_magic() {
        let unit = TranslationUnit::new();
        let mut bytes = dump(&unit, Encoding::Binary);
        bytes[0] = b'X';
        assert!(matches!(load(&bytes, &[], "__intrinsic_"), Err(SerializeError::BadMagic)));
    }

    #[test]
    fn rejects_newer_producer_version() {
        let unit = TranslationUnit::new();
        let mut bytes = dump(&unit, Encoding::Binary);
        bytes[5..9].copy_from_slice(&(PRODUCER_VERSION + 1).to_be_bytes());
        assert!(matches!(
            load(&bytes, &[], "__intrinsic_"),
            Err(SerializeError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_truncated_stream() {
        let unit = unit_with_one_program_and_variable();
        let bytes = dump(&unit, Encoding::Binary);
        let truncated = &bytes[..bytes.len() - 3];
        assert!(matches!(load(truncated, &[], "__intrinsic_"), Err(SerializeError::UnexpectedEof)));
    }

    #[test]
    fn forward_reference_to_a_later_subroutine_resolves() {
        // `call helper()` appears inside `main`'s body, written before
        // `helper` itself is reached in the module's symbol list -- the
        // deserializer must park a Shell and fill it in once `helper`'s own
        // definition is read.
        use crate::asr::{Stmt, StmtKind, SymbolKind};
        use crate::location::Span;

        let mut unit = TranslationUnit::new();
        let helper_table = unit
            .arena
            .tables
            .alloc(SymbolTable::new(Some(unit.global_table), None));
        let helper = unit.arena.symbols.alloc(Symbol::Subroutine(crate::asr::SubroutineSym {
            name: "helper".to_owned(),
            table: helper_table,
            args: Vec::new(),
            body: Vec::new(),
            bind_name: None,
            external: None,
            abi: Abi::Source,
        }));
        unit.arena.tables.get_mut(helper_table).owner = Some(helper);

        let main_table = unit
            .arena
            .tables
            .alloc(SymbolTable::new(Some(unit.global_table), None));
        let call_helper = Stmt::new(
            StmtKind::SubroutineCall { callee: helper, args: Vec::new() },
            Span::new(0, 0),
        );
        let main = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table: main_table,
            body: vec![call_helper],
        }));
        unit.arena.tables.get_mut(main_table).owner = Some(main);

        // Bind `main` before `helper` so the writer visits main's body
        // (and its forward reference) before helper's own definition.
        unit.arena.tables.get_mut(unit.global_table).bind("main", main);
        unit.arena.tables.get_mut(unit.global_table).bind("helper", helper);

        let bytes = dump(&unit, Encoding::Binary);
        let loaded = load(&bytes, &[], "__intrinsic_").unwrap();

        let main_id = loaded.arena.tables.get(loaded.global_table).get_local("main").unwrap();
        let Symbol::Program(main_sym) = loaded.arena.symbols.get(main_id) else {
            panic!("expected a Program symbol");
        };
        let StmtKind::SubroutineCall { callee, .. } = &main_sym.body[0].kind else {
            panic!("expected a SubroutineCall statement");
        };
        let resolved = loaded.arena.symbols.get(*callee);
        assert_eq!(resolved.kind(), SymbolKind::Subroutine);
        assert_eq!(resolved.name(), "helper");
    }
}
