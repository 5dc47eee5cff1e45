//! Phase 1 of AST -> ASR lowering: the symbol-table pass (§4.2 Phase 1).
//!
//! Walks every declaration-bearing node and creates its owning symbol table,
//! variable declarations, procedure shells (args and return variable bound,
//! body left empty), derived-type member tables, and generic-procedure
//! interfaces. Statement bodies are filled in afterwards by [`super::body_pass`].
use ahash::AHashMap;

use crate::asr::{
    Abi, Access, DerivedTypeSym, ExternalDescriptor, FunctionSym, GenericProcedureSym, Intent, ModuleSym, ProgramSym,
    Storage, SubroutineSym, Symbol, SymbolId, TranslationUnit, Variable,
};
use crate::ast;
use crate::error::SemanticError;
use crate::symbol_table::{SymbolTable, SymbolTableId};
use crate::types::{Dimension, Dimensions, Type};

/// Names (lowercased) of top-level subprograms declared as interactive
/// prototypes, tracked only for the duration of this pass: a later
/// redefinition of the same name is a shadow, not an "already defined"
/// error (§4.2 Phase 1, scenario 4).
#[derive(Default)]
struct PrototypeNames(ahash::AHashSet<String>);

impl PrototypeNames {
    fn mark(&mut self, name: &str) {
        self.0.insert(name.to_ascii_lowercase());
    }

    fn contains(&self, name: &str) -> bool {
        self.0.contains(&name.to_ascii_lowercase())
    }
}

/// Every symbol Phase 1 created, indexed in exactly the order [`super::body_pass`]
/// re-walks `ast` in, so Phase 2 never has to re-resolve a subprogram by name
/// (which would pick the wrong symbol when an interactive prototype has been
/// shadowed).
#[derive(Default)]
pub struct LoweredSymbols {
    /// Parallel to `ast.modules`: `(module_symbol, subprogram_symbols)`.
    pub modules: Vec<(SymbolId, Vec<SymbolId>)>,
    /// Parallel to `ast.top_level_subprograms`.
    pub top_level_subprograms: Vec<SymbolId>,
    /// `(program_symbol, internal_subprogram_symbols)`, parallel to
    /// `ast.program` and its `subprograms`.
    pub program: Option<(SymbolId, Vec<SymbolId>)>,
}

/// Runs Phase 1 over the whole translation unit, returning the populated
/// [`TranslationUnit`] (with every statement body still empty) and the
/// per-node symbol index Phase 2 needs.
pub fn build(ast: &ast::TranslationUnitAst) -> Result<(TranslationUnit, LoweredSymbols), SemanticError> {
    let mut unit = TranslationUnit::new();
    let mut modules = AHashMap::new();
    let mut prototypes = PrototypeNames::default();
    let mut lowered = LoweredSymbols::default();

    for module in &ast.modules {
        let (module_sym, subprogram_syms) = process_module(&mut unit, module, &modules)?;
        modules.insert(module.name.to_ascii_lowercase(), module_table_of(&unit, &module.name));
        lowered.modules.push((module_sym, subprogram_syms));
    }

    for subprogram in &ast.top_level_subprograms {
        let sym = process_subprogram_shell(&mut unit, unit.global_table, &modules, subprogram, &mut prototypes)?;
        lowered.top_level_subprograms.push(sym);
    }

    if let Some(program) = &ast.program {
        lowered.program = Some(process_program(&mut unit, program, &modules)?);
    }

    Ok((unit, lowered))
}

fn module_table_of(unit: &TranslationUnit, name: &str) -> SymbolTableId {
    let sym = unit
        .arena
        .tables
        .get(unit.global_table)
        .get_local(name)
        .expect("module symbol was just bound");
    match unit.arena.symbols.get(sym) {
        Symbol::Module(m) => m.table,
        _ => unreachable!("module name resolved to a non-module symbol"),
    }
}

fn bind_or_already_defined(
    unit: &mut TranslationUnit,
    table: SymbolTableId,
    name: &str,
    sym: SymbolId,
    span: crate::location::Span,
) -> Result<(), SemanticError> {
    if unit.arena.tables.get(table).contains_local(name) {
        return Err(SemanticError::new(format!("`{name}` is already defined in this scope"), span));
    }
    unit.arena.tables.get_mut(table).bind(name, sym);
    Ok(())
}

fn process_module(
    unit: &mut TranslationUnit,
    decl: &ast::ModuleDecl,
    modules: &AHashMap<String, SymbolTableId>,
) -> Result<(SymbolId, Vec<SymbolId>), SemanticError> {
    let table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
    let sym = unit.arena.symbols.alloc(Symbol::Module(ModuleSym {
        name: decl.name.clone(),
        table,
    }));
    unit.arena.tables.get_mut(table).owner = Some(sym);
    bind_or_already_defined(unit, unit.global_table, &decl.name, sym, decl.span)?;

    for derived_type in &decl.derived_types {
        process_derived_type(unit, table, derived_type)?;
    }
    for var in &decl.declarations {
        process_var_decl(unit, table, var, false)?;
    }
    let mut prototypes = PrototypeNames::default();
    let mut subprogram_syms = Vec::with_capacity(decl.subprograms.len());
    for subprogram in &decl.subprograms {
        subprogram_syms.push(process_subprogram_shell(unit, table, modules, subprogram, &mut prototypes)?);
    }
    process_interfaces(unit, table, &decl.interfaces)?;
    Ok((sym, subprogram_syms))
}

fn process_program(
    unit: &mut TranslationUnit,
    decl: &ast::ProgramDecl,
    modules: &AHashMap<String, SymbolTableId>,
) -> Result<(SymbolId, Vec<SymbolId>), SemanticError> {
    let table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
    for use_stmt in &decl.uses {
        process_use_stmt(unit, table, modules, use_stmt)?;
    }
    for derived_type in &decl.derived_types {
        process_derived_type(unit, table, derived_type)?;
    }
    for var in &decl.declarations {
        process_var_decl(unit, table, var, false)?;
    }
    let mut prototypes = PrototypeNames::default();
    let mut subprogram_syms = Vec::with_capacity(decl.subprograms.len());
    for subprogram in &decl.subprograms {
        subprogram_syms.push(process_subprogram_shell(unit, table, modules, subprogram, &mut prototypes)?);
    }
    process_interfaces(unit, table, &decl.interfaces)?;

    let sym = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
        name: decl.name.clone(),
        table,
        body: Vec::new(),
    }));
    unit.arena.tables.get_mut(table).owner = Some(sym);
    bind_or_already_defined(unit, unit.global_table, &decl.name, sym, decl.span)?;
    Ok((sym, subprogram_syms))
}

fn process_derived_type(
    unit: &mut TranslationUnit,
    parent_table: SymbolTableId,
    decl: &ast::DerivedTypeDecl,
) -> Result<SymbolId, SemanticError> {
    let table = unit.arena.tables.alloc(SymbolTable::new(Some(parent_table), None));
    for member in &decl.members {
        process_var_decl(unit, table, member, false)?;
    }
    let sym = unit.arena.symbols.alloc(Symbol::DerivedType(DerivedTypeSym {
        name: decl.name.clone(),
        table,
    }));
    unit.arena.tables.get_mut(table).owner = Some(sym);
    bind_or_already_defined(unit, parent_table, &decl.name, sym, decl.span)?;
    Ok(sym)
}

fn process_interfaces(unit: &mut TranslationUnit, table: SymbolTableId, interfaces: &[ast::InterfaceDecl]) -> Result<(), SemanticError> {
    for interface in interfaces {
        let mut procs = Vec::with_capacity(interface.procedures.len());
        for name in &interface.procedures {
            let Some(proc_id) = unit.arena.tables.get(table).get_local(name) else {
                return Err(SemanticError::new(
                    format!("interface `{}` names unknown procedure `{name}`", interface.name),
                    interface.span,
                ));
            };
            procs.push(proc_id);
        }
        let sym = unit.arena.symbols.alloc(Symbol::GenericProcedure(GenericProcedureSym {
            name: interface.name.clone(),
            parent_table: table,
            procs,
        }));
        bind_or_already_defined(unit, table, &interface.name, sym, interface.span)?;
    }
    Ok(())
}

fn process_use_stmt(
    unit: &mut TranslationUnit,
    table: SymbolTableId,
    modules: &AHashMap<String, SymbolTableId>,
    use_stmt: &ast::UseStmt,
) -> Result<(), SemanticError> {
    if use_stmt.only.is_empty() {
        return Err(SemanticError::new(
            "use statement must name an explicit only: import list",
            use_stmt.span,
        ));
    }
    let Some(&module_table) = modules.get(&use_stmt.module.to_ascii_lowercase()) else {
        return Err(SemanticError::new(format!("module `{}` not found", use_stmt.module), use_stmt.span));
    };
    for (local, original) in &use_stmt.only {
        let Some(target) = unit.arena.tables.get(module_table).get_local(original) else {
            return Err(SemanticError::new(
                format!("`{original}` is not a public name of module `{}`", use_stmt.module),
                use_stmt.span,
            ));
        };
        bind_or_already_defined(unit, table, local, target, use_stmt.span)?;
    }
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn process_subprogram_shell(
    unit: &mut TranslationUnit,
    parent_table: SymbolTableId,
    modules: &AHashMap<String, SymbolTableId>,
    decl: &ast::SubprogramDecl,
    prototypes: &mut PrototypeNames,
) -> Result<SymbolId, SemanticError> {
    let table = unit.arena.tables.alloc(SymbolTable::new(Some(parent_table), None));
    for use_stmt in &decl.uses {
        process_use_stmt(unit, table, modules, use_stmt)?;
    }

    let return_name = match decl.kind {
        ast::SubprogramKind::Function => decl.return_name.clone().unwrap_or_else(|| decl.name.clone()),
        ast::SubprogramKind::Subroutine => String::new(),
    };

    let mut args = Vec::with_capacity(decl.args.len());
    for arg_name in &decl.args {
        let vdecl = decl
            .declarations
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(arg_name))
            .ok_or_else(|| SemanticError::new(format!("argument `{arg_name}` has no declaration"), decl.span))?;
        args.push(process_var_decl(unit, table, vdecl, true)?);
    }
    for vdecl in &decl.declarations {
        let is_arg = decl.args.iter().any(|a| a.eq_ignore_ascii_case(&vdecl.name));
        let is_return = decl.kind == ast::SubprogramKind::Function && vdecl.name.eq_ignore_ascii_case(&return_name);
        if is_arg || is_return {
            continue;
        }
        process_var_decl(unit, table, vdecl, false)?;
    }

    let return_var = match decl.kind {
        ast::SubprogramKind::Function => {
            let vdecl = decl
                .declarations
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(&return_name))
                .ok_or_else(|| {
                    SemanticError::new(
                        format!("function `{}` has no declaration for its return variable `{return_name}`", decl.name),
                        decl.span,
                    )
                })?;
            Some(process_return_var_decl(unit, table, vdecl)?)
        }
        ast::SubprogramKind::Subroutine => None,
    };

    let external = None::<ExternalDescriptor>;
    let abi = if decl.bind_name.is_some() { Abi::BindC } else { Abi::Source };
    let sym = match decl.kind {
        ast::SubprogramKind::Function => unit.arena.symbols.alloc(Symbol::Function(FunctionSym {
            name: decl.name.clone(),
            table,
            args,
            return_var: return_var.expect("function always has a return variable"),
            body: Vec::new(),
            bind_name: decl.bind_name.clone(),
            external,
            abi,
        })),
        ast::SubprogramKind::Subroutine => unit.arena.symbols.alloc(Symbol::Subroutine(SubroutineSym {
            name: decl.name.clone(),
            table,
            args,
            body: Vec::new(),
            bind_name: decl.bind_name.clone(),
            external,
            abi,
        })),
    };
    unit.arena.tables.get_mut(table).owner = Some(sym);

    let shadowing_prototype = prototypes.contains(&decl.name) && unit.arena.tables.get(parent_table).contains_local(&decl.name);
    if shadowing_prototype || !unit.arena.tables.get(parent_table).contains_local(&decl.name) {
        unit.arena.tables.get_mut(parent_table).bind(&decl.name, sym);
    } else {
        return Err(SemanticError::new(format!("`{}` is already defined in this scope", decl.name), decl.span));
    }
    if decl.is_interactive_prototype {
        prototypes.mark(&decl.name);
    }
    Ok(sym)
}

fn process_return_var_decl(unit: &mut TranslationUnit, table: SymbolTableId, vdecl: &ast::VarDecl) -> Result<SymbolId, SemanticError> {
    if vdecl.intent.is_some() {
        return Err(SemanticError::new("a function's return variable cannot carry an intent attribute", vdecl.span));
    }
    let ty = resolved_type(unit, table, vdecl)?;
    let sym = unit.arena.symbols.alloc(Symbol::Variable(Variable {
        name: vdecl.name.clone(),
        parent_table: table,
        intent: Intent::ReturnVar,
        storage: Storage::Default,
        ty,
        initializer: None,
        abi: Abi::Source,
        access: Access::Public,
    }));
    unit.arena.tables.get_mut(table).bind(&vdecl.name, sym);
    Ok(sym)
}

fn process_var_decl(
    unit: &mut TranslationUnit,
    table: SymbolTableId,
    vdecl: &ast::VarDecl,
    is_argument: bool,
) -> Result<SymbolId, SemanticError> {
    if vdecl.intent.is_some() && !is_argument {
        return Err(SemanticError::new(
            format!("`{}` carries an intent attribute but is not an argument", vdecl.name),
            vdecl.span,
        ));
    }
    let intent = if is_argument {
        match vdecl.intent {
            Some(ast::IntentSpec::In) => Intent::In,
            Some(ast::IntentSpec::Out) => Intent::Out,
            Some(ast::IntentSpec::InOut) => Intent::InOut,
            None => Intent::Unspecified,
        }
    } else {
        Intent::Local
    };
    let storage = if vdecl.is_parameter {
        Storage::Parameter
    } else if vdecl.is_save {
        Storage::Save
    } else {
        Storage::Default
    };
    let ty = resolved_type(unit, table, vdecl)?;

    if unit.arena.tables.get(table).contains_local(&vdecl.name) {
        return Err(SemanticError::new(format!("`{}` is already defined in this scope", vdecl.name), vdecl.span));
    }
    let sym = unit.arena.symbols.alloc(Symbol::Variable(Variable {
        name: vdecl.name.clone(),
        parent_table: table,
        intent,
        storage,
        ty,
        initializer: None,
        abi: Abi::Source,
        access: Access::Public,
    }));
    unit.arena.tables.get_mut(table).bind(&vdecl.name, sym);
    Ok(sym)
}

fn resolved_type(unit: &TranslationUnit, table: SymbolTableId, vdecl: &ast::VarDecl) -> Result<Type, SemanticError> {
    let mut ty = resolve_type_spec(unit, table, &vdecl.type_spec)?;
    if !vdecl.dims.is_empty() {
        let dims: Dimensions = vdecl.dims.iter().map(lower_dim_spec).collect::<Result<_, _>>()?;
        ty = apply_dims(ty, dims);
    }
    Ok(ty)
}

fn resolve_type_spec(unit: &TranslationUnit, table: SymbolTableId, spec: &ast::TypeSpec) -> Result<Type, SemanticError> {
    let kind = extract_kind(spec)?;
    match spec.name.to_ascii_lowercase().as_str() {
        "integer" => Ok(Type::Integer(kind.unwrap_or(4), Dimensions::new())),
        "real" => Ok(Type::Real(kind.unwrap_or(4), Dimensions::new())),
        "complex" => Ok(Type::Complex(kind.unwrap_or(4), Dimensions::new())),
        "logical" => Ok(Type::Logical(kind.unwrap_or(4), Dimensions::new())),
        "character" => Ok(Type::Character(kind.unwrap_or(1), Dimensions::new())),
        other => {
            if let Some(sym) = unit.resolve(table, other) {
                if let Symbol::DerivedType(_) = unit.arena.symbols.get(sym) {
                    return Ok(Type::Derived(sym, Dimensions::new()));
                }
            }
            Err(SemanticError::new(format!("unknown type `{other}`"), spec.span))
        }
    }
}

fn extract_kind(spec: &ast::TypeSpec) -> Result<Option<u8>, SemanticError> {
    match &spec.kind_expr {
        None => Ok(None),
        Some(expr) => match &expr.kind {
            ast::ExprKind::Int(n) => {
                u8::try_from(*n).map(Some).map_err(|_| SemanticError::new("kind value out of range", expr.span))
            }
            _ => Err(SemanticError::new("kind expression must be a compile-time integer literal", expr.span)),
        },
    }
}

fn apply_dims(ty: Type, dims: Dimensions) -> Type {
    match ty {
        Type::Integer(k, _) => Type::Integer(k, dims),
        Type::Real(k, _) => Type::Real(k, dims),
        Type::Complex(k, _) => Type::Complex(k, dims),
        Type::Logical(k, _) => Type::Logical(k, dims),
        Type::Character(k, _) => Type::Character(k, dims),
        Type::Derived(s, _) => Type::Derived(s, dims),
        other => other,
    }
}

fn lower_dim_spec(d: &ast::DimSpec) -> Result<Dimension, SemanticError> {
    match &d.upper {
        None => Ok(Dimension::assumed_shape()),
        Some(upper) => {
            let upper_expr = lower_const_int_expr(upper)?;
            let lower_expr = match &d.lower {
                Some(l) => lower_const_int_expr(l)?,
                None => crate::asr::Expr::new(
                    crate::asr::ExprKind::ConstantInteger(1),
                    Type::Integer(4, Dimensions::new()),
                    upper.span,
                ),
            };
            Ok(Dimension::fixed(lower_expr, upper_expr))
        }
    }
}

/// Dimension bounds are restricted to compile-time integer literals (and
/// their negation) in this layer; bounds that reference another variable
/// (`dimension(n)` with a runtime `n`) are a body-pass, not a declaration-pass,
/// concern and are rejected here.
fn lower_const_int_expr(e: &ast::Expr) -> Result<crate::asr::Expr, SemanticError> {
    match &e.kind {
        ast::ExprKind::Int(n) => Ok(crate::asr::Expr::new(
            crate::asr::ExprKind::ConstantInteger(*n),
            Type::Integer(4, Dimensions::new()),
            e.span,
        )),
        ast::ExprKind::UnaryOp(ast::UnaryOpKind::Neg, inner) => {
            let inner_asr = lower_const_int_expr(inner)?;
            match inner_asr.kind {
                crate::asr::ExprKind::ConstantInteger(n) => {
                    Ok(crate::asr::Expr::new(crate::asr::ExprKind::ConstantInteger(-n), inner_asr.ty, e.span))
                }
                _ => unreachable!("lower_const_int_expr only ever produces ConstantInteger"),
            }
        }
        _ => Err(SemanticError::new(
            "dimension bound must be a compile-time integer constant in this layer",
            e.span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Span;

    fn span() -> Span {
        Span::new(0, 1)
    }

    fn int_type_spec() -> ast::TypeSpec {
        ast::TypeSpec {
            name: "integer".to_owned(),
            kind_expr: None,
            span: span(),
        }
    }

    fn var(name: &str, intent: Option<ast::IntentSpec>) -> ast::VarDecl {
        ast::VarDecl {
            name: name.to_owned(),
            type_spec: int_type_spec(),
            dims: Vec::new(),
            intent,
            is_parameter: false,
            is_save: false,
            initializer: None,
            span: span(),
        }
    }

    fn empty_program(name: &str) -> ast::ProgramDecl {
        ast::ProgramDecl {
            name: name.to_owned(),
            declarations: Vec::new(),
            uses: Vec::new(),
            derived_types: Vec::new(),
            interfaces: Vec::new(),
            subprograms: Vec::new(),
            body: Vec::new(),
            span: span(),
        }
    }

    #[test]
    fn rejects_intent_on_a_non_argument_variable() {
        let mut ast = ast::TranslationUnitAst::default();
        let mut program = empty_program("main");
        program.declarations.push(var("x", Some(ast::IntentSpec::In)));
        ast.program = Some(program);

        let err = build(&ast).unwrap_err();
        assert!(err.message.contains("intent"));
    }

    #[test]
    fn redefining_a_module_name_is_already_defined() {
        let mut ast = ast::TranslationUnitAst::default();
        ast.modules.push(ast::ModuleDecl {
            name: "m".to_owned(),
            declarations: Vec::new(),
            derived_types: Vec::new(),
            interfaces: Vec::new(),
            subprograms: Vec::new(),
            span: span(),
        });
        ast.modules.push(ast::ModuleDecl {
            name: "m".to_owned(),
            declarations: Vec::new(),
            derived_types: Vec::new(),
            interfaces: Vec::new(),
            subprograms: Vec::new(),
            span: span(),
        });

        let err = build(&ast).unwrap_err();
        assert!(err.message.contains("already defined"));
    }

    #[test]
    fn use_statement_without_only_is_rejected() {
        let mut ast = ast::TranslationUnitAst::default();
        ast.modules.push(ast::ModuleDecl {
            name: "m".to_owned(),
            declarations: Vec::new(),
            derived_types: Vec::new(),
            interfaces: Vec::new(),
            subprograms: Vec::new(),
            span: span(),
        });
        let mut program = empty_program("main");
        program.uses.push(ast::UseStmt {
            module: "m".to_owned(),
            only: Vec::new(),
            span: span(),
        });
        ast.program = Some(program);

        let err = build(&ast).unwrap_err();
        assert!(err.message.contains("only"));
    }

    #[test]
    fn use_statement_imports_a_module_variable_by_alias() {
        let mut ast = ast::TranslationUnitAst::default();
        let mut module = ast::ModuleDecl {
            name: "m".to_owned(),
            declarations: Vec::new(),
            derived_types: Vec::new(),
            interfaces: Vec::new(),
            subprograms: Vec::new(),
            span: span(),
        };
        module.declarations.push(var("pi", None));
        ast.modules.push(module);

        let mut program = empty_program("main");
        program.uses.push(ast::UseStmt {
            module: "m".to_owned(),
            only: vec![("my_pi".to_owned(), "pi".to_owned())],
            span: span(),
        });
        ast.program = Some(program);

        let (unit, _) = build(&ast).expect("lowering succeeds");
        let prog_sym = unit.arena.tables.get(unit.global_table).get_local("main").unwrap();
        let Symbol::Program(prog) = unit.arena.symbols.get(prog_sym) else {
            panic!("expected Program symbol");
        };
        assert!(unit.arena.tables.get(prog.table).contains_local("my_pi"));
    }

    #[test]
    fn a_function_without_a_return_variable_declaration_is_an_error() {
        let mut ast = ast::TranslationUnitAst::default();
        ast.top_level_subprograms.push(ast::SubprogramDecl {
            name: "f".to_owned(),
            kind: ast::SubprogramKind::Function,
            args: Vec::new(),
            return_name: None,
            bind_name: None,
            declarations: Vec::new(),
            uses: Vec::new(),
            body: Vec::new(),
            span: span(),
            is_interactive_prototype: false,
        });

        let err = build(&ast).unwrap_err();
        assert!(err.message.contains("return variable"));
    }

    #[test]
    fn an_interactive_prototype_can_be_redefined_without_already_defined() {
        let mut ast = ast::TranslationUnitAst::default();
        for _ in 0..2 {
            ast.top_level_subprograms.push(ast::SubprogramDecl {
                name: "f".to_owned(),
                kind: ast::SubprogramKind::Function,
                args: vec!["i".to_owned()],
                return_name: None,
                bind_name: None,
                declarations: vec![var("i", Some(ast::IntentSpec::In)), var("f", None)],
                uses: Vec::new(),
                body: Vec::new(),
                span: span(),
                is_interactive_prototype: true,
            });
        }

        let (unit, _) = build(&ast).expect("second prototype shadows the first");
        assert!(unit.arena.tables.get(unit.global_table).contains_local("f"));
    }
}
