//! Tag-then-fields tree encoding for one `TranslationUnit` (§4.5).
//!
//! Every node writes a one-byte variant tag, then its scalar fields in
//! field order, then its sub-nodes recursively; a symbol-table-owning
//! symbol's table is written in full immediately after the symbol's own
//! scalar fields. A `SymbolId` that merely *refers* to a symbol defined
//! elsewhere -- a call callee, a `Var` operand, a generic procedure's
//! candidate list -- is written as `(symtab_id, variant_tag, name)` instead
//! of inline, the same triple a forward reference uses, so the reader can
//! resolve both cases through one mechanism.
//!
//! Tables are forward-referenceable too: a reference triple's `symtab_id`
//! may name a table this traversal hasn't reached yet (a call to a sibling
//! subroutine declared later in the same module, say). Both directions
//! assign a table its stream id the first time *either* side mentions it --
//! as the home of a reference, or as the table about to be written/read in
//! full -- so the numbering lines up without a separate table directory.

use ahash::AHashMap;

use crate::arena::Store;
use crate::asr::{
    Abi, Access, BinOpKind, BoolOpKind, BoundKind, CastKind, CmpOpKind, DerivedTypeSym, DoLoopHead, Expr, ExprKind,
    ExternalDescriptor, ExternalSymbolSym, FunctionSym, GenericProcedureSym, Intent, ModuleSym, ProgramSym,
    SelectArm, SelectPattern, Storage, StrOpKind, Stmt, StmtKind, SubroutineSym, Symbol, SymbolId, SymbolKind,
    TranslationUnit, UnaryOpKind, Variable,
};
use crate::error::SerializeError;
use crate::location::Span;
use crate::symbol_table::{SymbolTable, SymbolTableId};
use crate::types::{Dimension, Dimensions, Type};

use super::reader::Reader;
use super::writer::Writer;

struct WriteCtx {
    table_ids: AHashMap<SymbolTableId, u32>,
    next_table_id: u32,
    owners: AHashMap<SymbolId, SymbolTableId>,
}

impl WriteCtx {
    fn table_stream_id(&mut self, id: SymbolTableId) -> u32 {
        *self.table_ids.entry(id).or_insert_with(|| {
            let next = self.next_table_id;
            self.next_table_id += 1;
            next
        })
    }
}

/// Maps every bound symbol to the table it is bound in, by walking the
/// table-ownership tree once before encoding starts.
fn build_owner_index(unit: &TranslationUnit) -> AHashMap<SymbolId, SymbolTableId> {
    let mut owners = AHashMap::new();
    index_table(unit, unit.global_table, &mut owners);
    owners
}

fn index_table(unit: &TranslationUnit, table_id: SymbolTableId, owners: &mut AHashMap<SymbolId, SymbolTableId>) {
    let table = unit.arena.tables.get(table_id);
    let members: Vec<SymbolId> = table.local_symbols().map(|(_, id)| id).collect();
    for sym_id in members {
        owners.insert(sym_id, table_id);
        if let Some(child) = unit.arena.symbols.get(sym_id).own_table() {
            index_table(unit, child, owners);
        }
    }
}

struct ReadCtx {
    slots: Vec<Option<SymbolTableId>>,
    /// Keyed by `(home table, lowercased name)`; holds both not-yet-defined
    /// forward-reference shells and already-defined symbols, so a reference
    /// seen after its definition finds the real id the same way.
    shells: AHashMap<(SymbolTableId, String), SymbolId>,
}

impl ReadCtx {
    fn table_for_stream(&mut self, stream_id: u32, unit: &mut TranslationUnit) -> SymbolTableId {
        let idx = stream_id as usize;
        if idx >= self.slots.len() {
            self.slots.resize(idx + 1, None);
        }
        if let Some(id) = self.slots[idx] {
            return id;
        }
        let id = unit.arena.tables.alloc(SymbolTable::new(None, None));
        self.slots[idx] = Some(id);
        id
    }
}

pub fn write_tree(w: &mut dyn Writer, unit: &TranslationUnit) {
    let owners = build_owner_index(unit);
    let mut ctx = WriteCtx {
        table_ids: AHashMap::new(),
        next_table_id: 0,
        owners,
    };
    write_symbol_table(w, unit, &mut ctx, unit.global_table);
    write_stmts(w, unit, &mut ctx, &unit.orphan_items);
}

pub fn read_tree(r: &mut dyn Reader) -> Result<TranslationUnit, SerializeError> {
    let mut unit = TranslationUnit::new();
    unit.arena.tables = Store::new();
    let mut ctx = ReadCtx {
        slots: Vec::new(),
        shells: AHashMap::new(),
    };
    unit.global_table = read_symbol_table(r, &mut unit, &mut ctx)?;
    unit.orphan_items = read_stmts(r, &mut unit, &mut ctx)?;
    Ok(unit)
}

fn write_symbol_table(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, table_id: SymbolTableId) {
    let stream_id = ctx.table_stream_id(table_id);
    w.write_u32(stream_id);
    let table = unit.arena.tables.get(table_id);
    let members: Vec<SymbolId> = table.local_symbols().map(|(_, id)| id).collect();
    w.write_u32(u32::try_from(members.len()).expect("symbol table too large to serialize"));
    for sym_id in members {
        write_symbol_def(w, unit, ctx, unit.arena.symbols.get(sym_id));
    }
}

fn read_symbol_table(
    r: &mut dyn Reader,
    unit: &mut TranslationUnit,
    ctx: &mut ReadCtx,
) -> Result<SymbolTableId, SerializeError> {
    let stream_id = r.read_u32()?;
    let table_id = ctx.table_for_stream(stream_id, unit);
    let n = r.read_u32()?;
    for _ in 0..n {
        read_symbol_def(r, unit, ctx, table_id)?;
    }
    Ok(table_id)
}

fn write_symbol_def(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, sym: &Symbol) {
    w.write_u8(sym.kind() as u8);
    match sym {
        Symbol::Program(s) => {
            w.write_str(&s.name);
            write_symbol_table(w, unit, ctx, s.table);
            write_stmts(w, unit, ctx, &s.body);
        }
        Symbol::Module(s) => {
            w.write_str(&s.name);
            write_symbol_table(w, unit, ctx, s.table);
        }
        Symbol::Subroutine(s) => {
            w.write_str(&s.name);
            write_symbol_table(w, unit, ctx, s.table);
            write_symbol_ref_list(w, unit, ctx, &s.args);
            write_stmts(w, unit, ctx, &s.body);
            write_opt_str(w, s.bind_name.as_deref());
            write_opt_external(w, s.external.as_ref());
            w.write_u8(s.abi as u8);
        }
        Symbol::Function(s) => {
            w.write_str(&s.name);
            write_symbol_table(w, unit, ctx, s.table);
            write_symbol_ref_list(w, unit, ctx, &s.args);
            write_symbol_ref(w, unit, ctx, s.return_var);
            write_stmts(w, unit, ctx, &s.body);
            write_opt_str(w, s.bind_name.as_deref());
            write_opt_external(w, s.external.as_ref());
            w.write_u8(s.abi as u8);
        }
        Symbol::GenericProcedure(s) => {
            w.write_str(&s.name);
            write_symbol_ref_list(w, unit, ctx, &s.procs);
        }
        Symbol::DerivedType(s) => {
            w.write_str(&s.name);
            write_symbol_table(w, unit, ctx, s.table);
        }
        Symbol::Variable(v) => {
            w.write_str(&v.name);
            write_type(w, unit, ctx, &v.ty);
            w.write_u8(v.intent as u8);
            w.write_u8(v.storage as u8);
            write_opt_expr(w, unit, ctx, v.initializer.as_ref());
            w.write_u8(v.abi as u8);
            w.write_u8(v.access as u8);
        }
        Symbol::ExternalSymbol(e) => {
            w.write_str(&e.name);
            w.write_str(&e.module_name);
            w.write_str(&e.original_name);
        }
        Symbol::Shell { .. } => {
            unreachable!("Shell is a deserializer-only placeholder, never present in a loaded TranslationUnit")
        }
    }
}

/// Allocates or overwrites the arena slot for a just-read symbol definition
/// and binds it under `name` in `owner_table_id`, reusing a forward-reference
/// shell's id in place (`Store::replace`) if one was already parked there.
fn bind_symbol_definition(
    unit: &mut TranslationUnit,
    ctx: &mut ReadCtx,
    owner_table_id: SymbolTableId,
    name: &str,
    sym: Symbol,
    owned_table: Option<SymbolTableId>,
) -> SymbolId {
    let key = (owner_table_id, name.to_ascii_lowercase());
    let sym_id = if let Some(&existing) = ctx.shells.get(&key) {
        unit.arena.symbols.replace(existing, sym);
        existing
    } else {
        let id = unit.arena.symbols.alloc(sym);
        unit.arena.tables.get_mut(owner_table_id).bind(name, id);
        ctx.shells.insert(key, id);
        id
    };
    if let Some(table_id) = owned_table {
        unit.arena.tables.get_mut(table_id).owner = Some(sym_id);
    }
    sym_id
}

fn read_symbol_def(
    r: &mut dyn Reader,
    unit: &mut TranslationUnit,
    ctx: &mut ReadCtx,
    owner_table_id: SymbolTableId,
) -> Result<(), SerializeError> {
    let tag = r.read_u8()?;
    let kind = SymbolKind::from_repr(tag).ok_or(SerializeError::UnknownTag(tag))?;
    let name = r.read_str()?;
    match kind {
        SymbolKind::Program => {
            let table = read_symbol_table(r, unit, ctx)?;
            let body = read_stmts(r, unit, ctx)?;
            let sym = Symbol::Program(ProgramSym { name: name.clone(), table, body });
            bind_symbol_definition(unit, ctx, owner_table_id, &name, sym, Some(table));
        }
        SymbolKind::Module => {
            let table = read_symbol_table(r, unit, ctx)?;
            let sym = Symbol::Module(ModuleSym { name: name.clone(), table });
            bind_symbol_definition(unit, ctx, owner_table_id, &name, sym, Some(table));
        }
        SymbolKind::Subroutine => {
            let table = read_symbol_table(r, unit, ctx)?;
            let args = read_symbol_ref_list(r, unit, ctx)?;
            let body = read_stmts(r, unit, ctx)?;
            let bind_name = read_opt_str(r)?;
            let external = read_opt_external(r)?;
            let abi = read_abi(r)?;
            let sym = Symbol::Subroutine(SubroutineSym {
                name: name.clone(),
                table,
                args,
                body,
                bind_name,
                external,
                abi,
            });
            bind_symbol_definition(unit, ctx, owner_table_id, &name, sym, Some(table));
        }
        SymbolKind::Function => {
            let table = read_symbol_table(r, unit, ctx)?;
            let args = read_symbol_ref_list(r, unit, ctx)?;
            let return_var = read_symbol_ref(r, unit, ctx)?;
            let body = read_stmts(r, unit, ctx)?;
            let bind_name = read_opt_str(r)?;
            let external = read_opt_external(r)?;
            let abi = read_abi(r)?;
            let sym = Symbol::Function(FunctionSym {
                name: name.clone(),
                table,
                args,
                return_var,
                body,
                bind_name,
                external,
                abi,
            });
            bind_symbol_definition(unit, ctx, owner_table_id, &name, sym, Some(table));
        }
        SymbolKind::GenericProcedure => {
            let procs = read_symbol_ref_list(r, unit, ctx)?;
            let sym = Symbol::GenericProcedure(GenericProcedureSym {
                name: name.clone(),
                parent_table: owner_table_id,
                procs,
            });
            bind_symbol_definition(unit, ctx, owner_table_id, &name, sym, None);
        }
        SymbolKind::DerivedType => {
            let table = read_symbol_table(r, unit, ctx)?;
            let sym = Symbol::DerivedType(DerivedTypeSym { name: name.clone(), table });
            bind_symbol_definition(unit, ctx, owner_table_id, &name, sym, Some(table));
        }
        SymbolKind::Variable => {
            let ty = read_type(r, unit, ctx)?;
            let intent = read_intent(r)?;
            let storage = read_storage(r)?;
            let initializer = read_opt_expr(r, unit, ctx)?;
            let abi = read_abi(r)?;
            let access = read_access(r)?;
            let sym = Symbol::Variable(Variable {
                name: name.clone(),
                parent_table: owner_table_id,
                intent,
                storage,
                ty,
                initializer,
                abi,
                access,
            });
            bind_symbol_definition(unit, ctx, owner_table_id, &name, sym, None);
        }
        SymbolKind::ExternalSymbol => {
            let module_name = r.read_str()?;
            let original_name = r.read_str()?;
            let sym = Symbol::ExternalSymbol(ExternalSymbolSym {
                name: name.clone(),
                parent_table: owner_table_id,
                module_name,
                original_name,
                external: None,
            });
            bind_symbol_definition(unit, ctx, owner_table_id, &name, sym, None);
        }
    }
    Ok(())
}

fn write_symbol_ref(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, sym_id: SymbolId) {
    let sym = unit.arena.symbols.get(sym_id);
    let home = *ctx
        .owners
        .get(&sym_id)
        .unwrap_or_else(|| panic!("symbol `{}` is not bound in any table", sym.name()));
    let stream_id = ctx.table_stream_id(home);
    w.write_u32(stream_id);
    w.write_u8(sym.kind() as u8);
    w.write_str(sym.name());
}

fn read_symbol_ref(r: &mut dyn Reader, unit: &mut TranslationUnit, ctx: &mut ReadCtx) -> Result<SymbolId, SerializeError> {
    let stream_id = r.read_u32()?;
    let tag = r.read_u8()?;
    let kind = SymbolKind::from_repr(tag).ok_or(SerializeError::UnknownTag(tag))?;
    let name = r.read_str()?;
    let table_id = ctx.table_for_stream(stream_id, unit);
    let key = (table_id, name.to_ascii_lowercase());
    if let Some(&id) = ctx.shells.get(&key) {
        return Ok(id);
    }
    if let Some(id) = unit.arena.tables.get(table_id).get_local(&name) {
        ctx.shells.insert(key, id);
        return Ok(id);
    }
    let id = unit.arena.symbols.alloc(Symbol::Shell { kind, name: name.clone() });
    unit.arena.tables.get_mut(table_id).bind(&name, id);
    ctx.shells.insert(key, id);
    Ok(id)
}

fn write_symbol_ref_list(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, ids: &[SymbolId]) {
    w.write_u32(u32::try_from(ids.len()).expect("argument list too long to serialize"));
    for &id in ids {
        write_symbol_ref(w, unit, ctx, id);
    }
}

fn read_symbol_ref_list(
    r: &mut dyn Reader,
    unit: &mut TranslationUnit,
    ctx: &mut ReadCtx,
) -> Result<Vec<SymbolId>, SerializeError> {
    let n = r.read_u32()?;
    (0..n).map(|_| read_symbol_ref(r, unit, ctx)).collect()
}

fn write_opt_str(w: &mut dyn Writer, s: Option<&str>) {
    w.write_bool(s.is_some());
    if let Some(s) = s {
        w.write_str(s);
    }
}

fn read_opt_str(r: &mut dyn Reader) -> Result<Option<String>, SerializeError> {
    if r.read_bool()? { Ok(Some(r.read_str()?)) } else { Ok(None) }
}

fn write_opt_external(w: &mut dyn Writer, ext: Option<&ExternalDescriptor>) {
    w.write_bool(ext.is_some());
    if let Some(ext) = ext {
        w.write_str(&ext.module_name);
        w.write_str(&ext.original_name);
    }
}

fn read_opt_external(r: &mut dyn Reader) -> Result<Option<ExternalDescriptor>, SerializeError> {
    if r.read_bool()? {
        Ok(Some(ExternalDescriptor {
            module_name: r.read_str()?,
            original_name: r.read_str()?,
        }))
    } else {
        Ok(None)
    }
}

fn read_intent(r: &mut dyn Reader) -> Result<Intent, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => Intent::Local,
        1 => Intent::In,
        2 => Intent::Out,
        3 => Intent::InOut,
        4 => Intent::Unspecified,
        5 => Intent::ReturnVar,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

fn read_storage(r: &mut dyn Reader) -> Result<Storage, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => Storage::Default,
        1 => Storage::Save,
        2 => Storage::Parameter,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

fn read_access(r: &mut dyn Reader) -> Result<Access, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => Access::Public,
        1 => Access::Private,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

fn read_abi(r: &mut dyn Reader) -> Result<Abi, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => Abi::Source,
        1 => Abi::BindC,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

const TY_INTEGER: u8 = 0;
const TY_REAL: u8 = 1;
const TY_COMPLEX: u8 = 2;
const TY_LOGICAL: u8 = 3;
const TY_CHARACTER: u8 = 4;
const TY_DERIVED: u8 = 5;
const TY_POINTER: u8 = 6;
const TY_CONST: u8 = 7;
const TY_CPTR: u8 = 8;
const TY_TUPLE: u8 = 9;
const TY_LIST: u8 = 10;
const TY_DICT: u8 = 11;
const TY_UNION: u8 = 12;
const TY_ENUM: u8 = 13;

fn write_type(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, ty: &Type) {
    match ty {
        Type::Integer(k, d) => {
            w.write_u8(TY_INTEGER);
            w.write_u8(*k);
            write_dimensions(w, unit, ctx, d);
        }
        Type::Real(k, d) => {
            w.write_u8(TY_REAL);
            w.write_u8(*k);
            write_dimensions(w, unit, ctx, d);
        }
        Type::Complex(k, d) => {
            w.write_u8(TY_COMPLEX);
            w.write_u8(*k);
            write_dimensions(w, unit, ctx, d);
        }
        Type::Logical(k, d) => {
            w.write_u8(TY_LOGICAL);
            w.write_u8(*k);
            write_dimensions(w, unit, ctx, d);
        }
        Type::Character(k, d) => {
            w.write_u8(TY_CHARACTER);
            w.write_u8(*k);
            write_dimensions(w, unit, ctx, d);
        }
        Type::Derived(sym, d) => {
            w.write_u8(TY_DERIVED);
            write_symbol_ref(w, unit, ctx, *sym);
            write_dimensions(w, unit, ctx, d);
        }
        Type::Pointer(inner) => {
            w.write_u8(TY_POINTER);
            write_type(w, unit, ctx, inner);
        }
        Type::Const(inner) => {
            w.write_u8(TY_CONST);
            write_type(w, unit, ctx, inner);
        }
        Type::CPtr => w.write_u8(TY_CPTR),
        Type::Tuple(ts) => {
            w.write_u8(TY_TUPLE);
            w.write_u32(u32::try_from(ts.len()).expect("tuple type too large to serialize"));
            for t in ts {
                write_type(w, unit, ctx, t);
            }
        }
        Type::List(inner) => {
            w.write_u8(TY_LIST);
            write_type(w, unit, ctx, inner);
        }
        Type::Dict(k, v) => {
            w.write_u8(TY_DICT);
            write_type(w, unit, ctx, k);
            write_type(w, unit, ctx, v);
        }
        Type::Union(ts) => {
            w.write_u8(TY_UNION);
            w.write_u32(u32::try_from(ts.len()).expect("union type too large to serialize"));
            for t in ts {
                write_type(w, unit, ctx, t);
            }
        }
        Type::Enum(sym) => {
            w.write_u8(TY_ENUM);
            write_symbol_ref(w, unit, ctx, *sym);
        }
    }
}

fn read_type(r: &mut dyn Reader, unit: &mut TranslationUnit, ctx: &mut ReadCtx) -> Result<Type, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        TY_INTEGER => Type::Integer(r.read_u8()?, read_dimensions(r, unit, ctx)?),
        TY_REAL => Type::Real(r.read_u8()?, read_dimensions(r, unit, ctx)?),
        TY_COMPLEX => Type::Complex(r.read_u8()?, read_dimensions(r, unit, ctx)?),
        TY_LOGICAL => Type::Logical(r.read_u8()?, read_dimensions(r, unit, ctx)?),
        TY_CHARACTER => Type::Character(r.read_u8()?, read_dimensions(r, unit, ctx)?),
        TY_DERIVED => {
            let sym = read_symbol_ref(r, unit, ctx)?;
            Type::Derived(sym, read_dimensions(r, unit, ctx)?)
        }
        TY_POINTER => Type::Pointer(Box::new(read_type(r, unit, ctx)?)),
        TY_CONST => Type::Const(Box::new(read_type(r, unit, ctx)?)),
        TY_CPTR => Type::CPtr,
        TY_TUPLE => {
            let n = r.read_u32()?;
            let mut ts = Vec::with_capacity(n as usize);
            for _ in 0..n {
                ts.push(read_type(r, unit, ctx)?);
            }
            Type::Tuple(ts)
        }
        TY_LIST => Type::List(Box::new(read_type(r, unit, ctx)?)),
        TY_DICT => {
            let k = read_type(r, unit, ctx)?;
            let v = read_type(r, unit, ctx)?;
            Type::Dict(Box::new(k), Box::new(v))
        }
        TY_UNION => {
            let n = r.read_u32()?;
            let mut ts = Vec::with_capacity(n as usize);
            for _ in 0..n {
                ts.push(read_type(r, unit, ctx)?);
            }
            Type::Union(ts)
        }
        TY_ENUM => Type::Enum(read_symbol_ref(r, unit, ctx)?),
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

fn write_dimensions(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, dims: &Dimensions) {
    w.write_u32(u32::try_from(dims.len()).expect("dimension list too long to serialize"));
    for d in dims {
        write_opt_expr(w, unit, ctx, d.lower.as_deref());
        write_opt_expr(w, unit, ctx, d.length.as_deref());
    }
}

fn read_dimensions(r: &mut dyn Reader, unit: &mut TranslationUnit, ctx: &mut ReadCtx) -> Result<Dimensions, SerializeError> {
    let n = r.read_u32()?;
    let mut dims = Dimensions::new();
    for _ in 0..n {
        let lower = read_opt_expr(r, unit, ctx)?.map(Box::new);
        let length = read_opt_expr(r, unit, ctx)?.map(Box::new);
        dims.push(Dimension { lower, length });
    }
    Ok(dims)
}

fn write_opt_expr(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, e: Option<&Expr>) {
    w.write_bool(e.is_some());
    if let Some(e) = e {
        write_expr(w, unit, ctx, e);
    }
}

fn read_opt_expr(r: &mut dyn Reader, unit: &mut TranslationUnit, ctx: &mut ReadCtx) -> Result<Option<Expr>, SerializeError> {
    if r.read_bool()? { Ok(Some(read_expr(r, unit, ctx)?)) } else { Ok(None) }
}

fn write_exprs(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, es: &[Expr]) {
    w.write_u32(u32::try_from(es.len()).expect("expression list too long to serialize"));
    for e in es {
        write_expr(w, unit, ctx, e);
    }
}

fn read_exprs(r: &mut dyn Reader, unit: &mut TranslationUnit, ctx: &mut ReadCtx) -> Result<Vec<Expr>, SerializeError> {
    let n = r.read_u32()?;
    (0..n).map(|_| read_expr(r, unit, ctx)).collect()
}

const EX_VAR: u8 = 0;
const EX_FUNCTION_CALL: u8 = 1;
const EX_BIN_OP: u8 = 2;
const EX_UNARY_OP: u8 = 3;
const EX_COMPARE: u8 = 4;
const EX_BOOL_OP: u8 = 5;
const EX_ARRAY_REF: u8 = 6;
const EX_ARRAY_INITIALIZER: u8 = 7;
const EX_ARRAY_SIZE: u8 = 8;
const EX_ARRAY_BOUND: u8 = 9;
const EX_ARRAY_RESHAPE: u8 = 10;
const EX_DERIVED_REF: u8 = 11;
const EX_IMPLIED_DO_LOOP: u8 = 12;
const EX_IMPLICIT_CAST: u8 = 13;
const EX_EXPLICIT_CAST: u8 = 14;
const EX_STR_OP: u8 = 15;
const EX_FUSED_MULTIPLY_ADD: u8 = 16;
const EX_STR: u8 = 17;
const EX_CONSTANT_INTEGER: u8 = 18;
const EX_CONSTANT_REAL: u8 = 19;
const EX_CONSTANT_LOGICAL: u8 = 20;
const EX_CONSTANT_COMPLEX: u8 = 21;

fn write_expr(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, e: &Expr) {
    match &e.kind {
        ExprKind::Var(sym) => {
            w.write_u8(EX_VAR);
            write_symbol_ref(w, unit, ctx, *sym);
        }
        ExprKind::FunctionCall { callee, args } => {
            w.write_u8(EX_FUNCTION_CALL);
            write_symbol_ref(w, unit, ctx, *callee);
            write_exprs(w, unit, ctx, args);
        }
        ExprKind::BinOp(op, l, r) => {
            w.write_u8(EX_BIN_OP);
            w.write_u8(*op as u8);
            write_expr(w, unit, ctx, l);
            write_expr(w, unit, ctx, r);
        }
        ExprKind::UnaryOp(op, operand) => {
            w.write_u8(EX_UNARY_OP);
            w.write_u8(*op as u8);
            write_expr(w, unit, ctx, operand);
        }
        ExprKind::Compare(op, l, r) => {
            w.write_u8(EX_COMPARE);
            w.write_u8(*op as u8);
            write_expr(w, unit, ctx, l);
            write_expr(w, unit, ctx, r);
        }
        ExprKind::BoolOp(op, es) => {
            w.write_u8(EX_BOOL_OP);
            w.write_u8(*op as u8);
            write_exprs(w, unit, ctx, es);
        }
        ExprKind::ArrayRef { base, indices } => {
            w.write_u8(EX_ARRAY_REF);
            write_expr(w, unit, ctx, base);
            write_exprs(w, unit, ctx, indices);
        }
        ExprKind::ArrayInitializer(es) => {
            w.write_u8(EX_ARRAY_INITIALIZER);
            write_exprs(w, unit, ctx, es);
        }
        ExprKind::ArraySize { array, dim } => {
            w.write_u8(EX_ARRAY_SIZE);
            write_expr(w, unit, ctx, array);
            write_opt_expr(w, unit, ctx, dim.as_deref());
        }
        ExprKind::ArrayBound { array, dim, bound } => {
            w.write_u8(EX_ARRAY_BOUND);
            write_expr(w, unit, ctx, array);
            write_expr(w, unit, ctx, dim);
            w.write_u8(*bound as u8);
        }
        ExprKind::ArrayReshape { array, shape } => {
            w.write_u8(EX_ARRAY_RESHAPE);
            write_expr(w, unit, ctx, array);
            write_expr(w, unit, ctx, shape);
        }
        ExprKind::DerivedRef { base, member } => {
            w.write_u8(EX_DERIVED_REF);
            write_expr(w, unit, ctx, base);
            write_symbol_ref(w, unit, ctx, *member);
        }
        ExprKind::ImpliedDoLoop { element, var, start, end, step } => {
            w.write_u8(EX_IMPLIED_DO_LOOP);
            write_expr(w, unit, ctx, element);
            write_symbol_ref(w, unit, ctx, *var);
            write_expr(w, unit, ctx, start);
            write_expr(w, unit, ctx, end);
            write_opt_expr(w, unit, ctx, step.as_deref());
        }
        ExprKind::ImplicitCast { operand, cast_kind } => {
            w.write_u8(EX_IMPLICIT_CAST);
            write_expr(w, unit, ctx, operand);
            w.write_u8(*cast_kind as u8);
        }
        ExprKind::ExplicitCast { operand, cast_kind } => {
            w.write_u8(EX_EXPLICIT_CAST);
            write_expr(w, unit, ctx, operand);
            w.write_u8(*cast_kind as u8);
        }
        ExprKind::StrOp(op, l, r) => {
            w.write_u8(EX_STR_OP);
            w.write_u8(*op as u8);
            write_expr(w, unit, ctx, l);
            write_expr(w, unit, ctx, r);
        }
        ExprKind::FusedMultiplyAdd(a, b, c) => {
            w.write_u8(EX_FUSED_MULTIPLY_ADD);
            write_expr(w, unit, ctx, a);
            write_expr(w, unit, ctx, b);
            write_expr(w, unit, ctx, c);
        }
        ExprKind::Str(s) => {
            w.write_u8(EX_STR);
            w.write_str(s);
        }
        ExprKind::ConstantInteger(i) => {
            w.write_u8(EX_CONSTANT_INTEGER);
            w.write_i64(*i);
        }
        ExprKind::ConstantReal(f) => {
            w.write_u8(EX_CONSTANT_REAL);
            w.write_f64(*f);
        }
        ExprKind::ConstantLogical(b) => {
            w.write_u8(EX_CONSTANT_LOGICAL);
            w.write_bool(*b);
        }
        ExprKind::ConstantComplex(re, im) => {
            w.write_u8(EX_CONSTANT_COMPLEX);
            w.write_f64(*re);
            w.write_f64(*im);
        }
    }
    write_type(w, unit, ctx, &e.ty);
    w.write_u32(e.span.start);
    w.write_u32(e.span.end);
}

fn read_expr(r: &mut dyn Reader, unit: &mut TranslationUnit, ctx: &mut ReadCtx) -> Result<Expr, SerializeError> {
    let tag = r.read_u8()?;
    let kind = match tag {
        EX_VAR => ExprKind::Var(read_symbol_ref(r, unit, ctx)?),
        EX_FUNCTION_CALL => {
            let callee = read_symbol_ref(r, unit, ctx)?;
            ExprKind::FunctionCall { callee, args: read_exprs(r, unit, ctx)? }
        }
        EX_BIN_OP => {
            let op = read_binop(r)?;
            let l = Box::new(read_expr(r, unit, ctx)?);
            let rhs = Box::new(read_expr(r, unit, ctx)?);
            ExprKind::BinOp(op, l, rhs)
        }
        EX_UNARY_OP => {
            let op = read_unaryop(r)?;
            ExprKind::UnaryOp(op, Box::new(read_expr(r, unit, ctx)?))
        }
        EX_COMPARE => {
            let op = read_cmpop(r)?;
            let l = Box::new(read_expr(r, unit, ctx)?);
            let rhs = Box::new(read_expr(r, unit, ctx)?);
            ExprKind::Compare(op, l, rhs)
        }
        EX_BOOL_OP => {
            let op = read_boolop(r)?;
            ExprKind::BoolOp(op, read_exprs(r, unit, ctx)?)
        }
        EX_ARRAY_REF => {
            let base = Box::new(read_expr(r, unit, ctx)?);
            ExprKind::ArrayRef { base, indices: read_exprs(r, unit, ctx)? }
        }
        EX_ARRAY_INITIALIZER => ExprKind::ArrayInitializer(read_exprs(r, unit, ctx)?),
        EX_ARRAY_SIZE => {
            let array = Box::new(read_expr(r, unit, ctx)?);
            let dim = read_opt_expr(r, unit, ctx)?.map(Box::new);
            ExprKind::ArraySize { array, dim }
        }
        EX_ARRAY_BOUND => {
            let array = Box::new(read_expr(r, unit, ctx)?);
            let dim = Box::new(read_expr(r, unit, ctx)?);
            let bound = read_boundkind(r)?;
            ExprKind::ArrayBound { array, dim, bound }
        }
        EX_ARRAY_RESHAPE => {
            let array = Box::new(read_expr(r, unit, ctx)?);
            let shape = Box::new(read_expr(r, unit, ctx)?);
            ExprKind::ArrayReshape { array, shape }
        }
        EX_DERIVED_REF => {
            let base = Box::new(read_expr(r, unit, ctx)?);
            ExprKind::DerivedRef { base, member: read_symbol_ref(r, unit, ctx)? }
        }
        EX_IMPLIED_DO_LOOP => {
            let element = Box::new(read_expr(r, unit, ctx)?);
            let var = read_symbol_ref(r, unit, ctx)?;
            let start = Box::new(read_expr(r, unit, ctx)?);
            let end = Box::new(read_expr(r, unit, ctx)?);
            let step = read_opt_expr(r, unit, ctx)?.map(Box::new);
            ExprKind::ImpliedDoLoop { element, var, start, end, step }
        }
        EX_IMPLICIT_CAST => {
            let operand = Box::new(read_expr(r, unit, ctx)?);
            ExprKind::ImplicitCast { operand, cast_kind: read_castkind(r)? }
        }
        EX_EXPLICIT_CAST => {
            let operand = Box::new(read_expr(r, unit, ctx)?);
            ExprKind::ExplicitCast { operand, cast_kind: read_castkind(r)? }
        }
        EX_STR_OP => {
            let op = read_strop(r)?;
            let l = Box::new(read_expr(r, unit, ctx)?);
            let rhs = Box::new(read_expr(r, unit, ctx)?);
            ExprKind::StrOp(op, l, rhs)
        }
        EX_FUSED_MULTIPLY_ADD => {
            let a = Box::new(read_expr(r, unit, ctx)?);
            let b = Box::new(read_expr(r, unit, ctx)?);
            let c = Box::new(read_expr(r, unit, ctx)?);
            ExprKind::FusedMultiplyAdd(a, b, c)
        }
        EX_STR => ExprKind::Str(r.read_str()?),
        EX_CONSTANT_INTEGER => ExprKind::ConstantInteger(r.read_i64()?),
        EX_CONSTANT_REAL => ExprKind::ConstantReal(r.read_f64()?),
        EX_CONSTANT_LOGICAL => ExprKind::ConstantLogical(r.read_bool()?),
        EX_CONSTANT_COMPLEX => {
            let re = r.read_f64()?;
            let im = r.read_f64()?;
            ExprKind::ConstantComplex(re, im)
        }
        _ => return Err(SerializeError::UnknownTag(tag)),
    };
    let ty = read_type(r, unit, ctx)?;
    let start = r.read_u32()?;
    let end = r.read_u32()?;
    Ok(Expr::new(kind, ty, Span::new(start, end)))
}

fn read_binop(r: &mut dyn Reader) -> Result<BinOpKind, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => BinOpKind::Add,
        1 => BinOpKind::Sub,
        2 => BinOpKind::Mul,
        3 => BinOpKind::Div,
        4 => BinOpKind::Pow,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

fn read_unaryop(r: &mut dyn Reader) -> Result<UnaryOpKind, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => UnaryOpKind::Neg,
        1 => UnaryOpKind::Not,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

fn read_cmpop(r: &mut dyn Reader) -> Result<CmpOpKind, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => CmpOpKind::Eq,
        1 => CmpOpKind::NotEq,
        2 => CmpOpKind::Lt,
        3 => CmpOpKind::LtE,
        4 => CmpOpKind::Gt,
        5 => CmpOpKind::GtE,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

fn read_boolop(r: &mut dyn Reader) -> Result<BoolOpKind, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => BoolOpKind::And,
        1 => BoolOpKind::Or,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

fn read_strop(r: &mut dyn Reader) -> Result<StrOpKind, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => StrOpKind::Concat,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

fn read_boundkind(r: &mut dyn Reader) -> Result<BoundKind, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => BoundKind::Lower,
        1 => BoundKind::Upper,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

fn read_castkind(r: &mut dyn Reader) -> Result<CastKind, SerializeError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        0 => CastKind::IntegerToReal,
        1 => CastKind::RealToInteger,
        2 => CastKind::RealToComplex,
        3 => CastKind::IntegerToComplex,
        4 => CastKind::RealToReal,
        5 => CastKind::IntegerToInteger,
        6 => CastKind::ComplexToComplex,
        7 => CastKind::LogicalToInteger,
        _ => return Err(SerializeError::UnknownTag(tag)),
    })
}

const ST_ASSIGNMENT: u8 = 0;
const ST_IF: u8 = 1;
const ST_WHILE_LOOP: u8 = 2;
const ST_DO_LOOP: u8 = 3;
const ST_DO_CONCURRENT_LOOP: u8 = 4;
const ST_SELECT: u8 = 5;
const ST_SUBROUTINE_CALL: u8 = 6;
const ST_PRINT: u8 = 7;
const ST_RETURN: u8 = 8;
const ST_STOP: u8 = 9;
const ST_ERROR_STOP: u8 = 10;
const ST_EXIT: u8 = 11;
const ST_CYCLE: u8 = 12;
const ST_GO_TO: u8 = 13;
const ST_GO_TO_TARGET: u8 = 14;
const ST_ASSERT: u8 = 15;
const ST_ALLOCATE: u8 = 16;
const ST_DEALLOCATE: u8 = 17;

fn write_stmts(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, stmts: &[Stmt]) {
    w.write_u32(u32::try_from(stmts.len()).expect("statement list too long to serialize"));
    for s in stmts {
        write_stmt(w, unit, ctx, s);
    }
}

fn read_stmts(r: &mut dyn Reader, unit: &mut TranslationUnit, ctx: &mut ReadCtx) -> Result<Vec<Stmt>, SerializeError> {
    let n = r.read_u32()?;
    (0..n).map(|_| read_stmt(r, unit, ctx)).collect()
}

fn write_do_loop_head(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, head: &DoLoopHead) {
    write_symbol_ref(w, unit, ctx, head.var);
    write_expr(w, unit, ctx, &head.start);
    write_expr(w, unit, ctx, &head.end);
    write_opt_expr(w, unit, ctx, head.step.as_ref());
}

fn read_do_loop_head(r: &mut dyn Reader, unit: &mut TranslationUnit, ctx: &mut ReadCtx) -> Result<DoLoopHead, SerializeError> {
    let var = read_symbol_ref(r, unit, ctx)?;
    let start = read_expr(r, unit, ctx)?;
    let end = read_expr(r, unit, ctx)?;
    let step = read_opt_expr(r, unit, ctx)?;
    Ok(DoLoopHead { var, start, end, step })
}

fn write_select_arms(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, arms: &[SelectArm]) {
    w.write_u32(u32::try_from(arms.len()).expect("select-case arm list too long to serialize"));
    for arm in arms {
        w.write_u32(u32::try_from(arm.patterns.len()).expect("select-case pattern list too long to serialize"));
        for pattern in &arm.patterns {
            match pattern {
                SelectPattern::Value(e) => {
                    w.write_u8(0);
                    write_expr(w, unit, ctx, e);
                }
                SelectPattern::Range(lo, hi) => {
                    w.write_u8(1);
                    write_expr(w, unit, ctx, lo);
                    write_expr(w, unit, ctx, hi);
                }
            }
        }
        write_stmts(w, unit, ctx, &arm.body);
    }
}

fn read_select_arms(r: &mut dyn Reader, unit: &mut TranslationUnit, ctx: &mut ReadCtx) -> Result<Vec<SelectArm>, SerializeError> {
    let n = r.read_u32()?;
    let mut arms = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let n_patterns = r.read_u32()?;
        let mut patterns = Vec::with_capacity(n_patterns as usize);
        for _ in 0..n_patterns {
            let tag = r.read_u8()?;
            patterns.push(match tag {
                0 => SelectPattern::Value(read_expr(r, unit, ctx)?),
                1 => {
                    let lo = read_expr(r, unit, ctx)?;
                    let hi = read_expr(r, unit, ctx)?;
                    SelectPattern::Range(lo, hi)
                }
                _ => return Err(SerializeError::UnknownTag(tag)),
            });
        }
        let body = read_stmts(r, unit, ctx)?;
        arms.push(SelectArm { patterns, body });
    }
    Ok(arms)
}

fn write_stmt(w: &mut dyn Writer, unit: &TranslationUnit, ctx: &mut WriteCtx, s: &Stmt) {
    match &s.kind {
        StmtKind::Assignment { target, value } => {
            w.write_u8(ST_ASSIGNMENT);
            write_expr(w, unit, ctx, target);
            write_expr(w, unit, ctx, value);
        }
        StmtKind::If { cond, then_body, else_body } => {
            w.write_u8(ST_IF);
            write_expr(w, unit, ctx, cond);
            write_stmts(w, unit, ctx, then_body);
            write_stmts(w, unit, ctx, else_body);
        }
        StmtKind::WhileLoop { cond, body } => {
            w.write_u8(ST_WHILE_LOOP);
            write_expr(w, unit, ctx, cond);
            write_stmts(w, unit, ctx, body);
        }
        StmtKind::DoLoop { head, body } => {
            w.write_u8(ST_DO_LOOP);
            write_do_loop_head(w, unit, ctx, head);
            write_stmts(w, unit, ctx, body);
        }
        StmtKind::DoConcurrentLoop { head, body } => {
            w.write_u8(ST_DO_CONCURRENT_LOOP);
            write_do_loop_head(w, unit, ctx, head);
            write_stmts(w, unit, ctx, body);
        }
        StmtKind::Select { test, arms, default } => {
            w.write_u8(ST_SELECT);
            write_expr(w, unit, ctx, test);
            write_select_arms(w, unit, ctx, arms);
            write_stmts(w, unit, ctx, default);
        }
        StmtKind::SubroutineCall { callee, args } => {
            w.write_u8(ST_SUBROUTINE_CALL);
            write_symbol_ref(w, unit, ctx, *callee);
            write_exprs(w, unit, ctx, args);
        }
        StmtKind::Print { args } => {
            w.write_u8(ST_PRINT);
            write_exprs(w, unit, ctx, args);
        }
        StmtKind::Return => w.write_u8(ST_RETURN),
        StmtKind::Stop { code } => {
            w.write_u8(ST_STOP);
            write_opt_expr(w, unit, ctx, code.as_ref());
        }
        StmtKind::ErrorStop { code } => {
            w.write_u8(ST_ERROR_STOP);
            write_opt_expr(w, unit, ctx, code.as_ref());
        }
        StmtKind::Exit => w.write_u8(ST_EXIT),
        StmtKind::Cycle => w.write_u8(ST_CYCLE),
        StmtKind::GoTo(n) => {
            w.write_u8(ST_GO_TO);
            w.write_u32(*n);
        }
        StmtKind::GoToTarget(n) => {
            w.write_u8(ST_GO_TO_TARGET);
            w.write_u32(*n);
        }
        StmtKind::Assert { cond, message } => {
            w.write_u8(ST_ASSERT);
            write_expr(w, unit, ctx, cond);
            write_opt_expr(w, unit, ctx, message.as_ref());
        }
        StmtKind::Allocate(es) => {
            w.write_u8(ST_ALLOCATE);
            write_exprs(w, unit, ctx, es);
        }
        StmtKind::Deallocate(es) => {
            w.write_u8(ST_DEALLOCATE);
            write_exprs(w, unit, ctx, es);
        }
    }
    w.write_u32(s.span.start);
    w.write_u32(s.span.end);
}

fn read_stmt(r: &mut dyn Reader, unit: &mut TranslationUnit, ctx: &mut ReadCtx) -> Result<Stmt, SerializeError> {
    let tag = r.read_u8()?;
    let kind = match tag {
        ST_ASSIGNMENT => {
            let target = read_expr(r, unit, ctx)?;
            let value = read_expr(r, unit, ctx)?;
            StmtKind::Assignment { target, value }
        }
        ST_IF => {
            let cond = read_expr(r, unit, ctx)?;
            let then_body = read_stmts(r, unit, ctx)?;
            let else_body = read_stmts(r, unit, ctx)?;
            StmtKind::If { cond, then_body, else_body }
        }
        ST_WHILE_LOOP => {
            let cond = read_expr(r, unit, ctx)?;
            StmtKind::WhileLoop { cond, body: read_stmts(r, unit, ctx)? }
        }
        ST_DO_LOOP => {
            let head = read_do_loop_head(r, unit, ctx)?;
            StmtKind::DoLoop { head, body: read_stmts(r, unit, ctx)? }
        }
        ST_DO_CONCURRENT_LOOP => {
            let head = read_do_loop_head(r, unit, ctx)?;
            StmtKind::DoConcurrentLoop { head, body: read_stmts(r, unit, ctx)? }
        }
        ST_SELECT => {
            let test = read_expr(r, unit, ctx)?;
            let arms = read_select_arms(r, unit, ctx)?;
            let default = read_stmts(r, unit, ctx)?;
            StmtKind::Select { test, arms, default }
        }
        ST_SUBROUTINE_CALL => {
            let callee = read_symbol_ref(r, unit, ctx)?;
            StmtKind::SubroutineCall { callee, args: read_exprs(r, unit, ctx)? }
        }
        ST_PRINT => StmtKind::Print { args: read_exprs(r, unit, ctx)? },
        ST_RETURN => StmtKind::Return,
        ST_STOP => StmtKind::Stop { code: read_opt_expr(r, unit, ctx)? },
        ST_ERROR_STOP => StmtKind::ErrorStop { code: read_opt_expr(r, unit, ctx)? },
        ST_EXIT => StmtKind::Exit,
        ST_CYCLE => StmtKind::Cycle,
        ST_GO_TO => StmtKind::GoTo(r.read_u32()?),
        ST_GO_TO_TARGET => StmtKind::GoToTarget(r.read_u32()?),
        ST_ASSERT => {
            let cond = read_expr(r, unit, ctx)?;
            StmtKind::Assert { cond, message: read_opt_expr(r, unit, ctx)? }
        }
        ST_ALLOCATE => StmtKind::Allocate(read_exprs(r, unit, ctx)?),
        ST_DEALLOCATE => StmtKind::Deallocate(read_exprs(r, unit, ctx)?),
        _ => return Err(SerializeError::UnknownTag(tag)),
    };
    let start = r.read_u32()?;
    let end = r.read_u32()?;
    Ok(Stmt::new(kind, Span::new(start, end)))
}
