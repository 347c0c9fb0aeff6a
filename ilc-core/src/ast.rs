//! Neutral external AST surface (spec §6): the shape every frontend parser
//! is expected to produce before handing a compilation unit to
//! [`crate::sem::analyzer::SemanticAnalyzer`]. Frontends own their own
//! concrete parse trees; this is the lowest common denominator the shared
//! pipeline operates on.

use crate::diagnostics::SourceLoc;

#[derive(Debug, Clone)]
pub struct CompilationUnit {
	pub namespace: String,
	pub uses: Vec<UseDirective>,
	pub decls: Vec<Decl>,
}

#[derive(Debug, Clone)]
pub struct UseDirective {
	pub ns: String,
	pub alias: Option<String>,
	pub loc: SourceLoc,
}

#[derive(Debug, Clone)]
pub enum Decl {
	Class(ClassDecl),
	Interface(InterfaceDecl),
	Procedure(ProcDecl),
	Const(ConstDecl),
}

#[derive(Debug, Clone)]
pub struct HeritageEntry {
	pub name: String,
	pub loc: SourceLoc,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
	pub name: String,
	pub is_abstract: bool,
	/// Raw heritage clause in source order; the first entry is the base
	/// class only if it resolves to one, otherwise every entry is an
	/// interface (spec: heritage-clause disambiguation).
	pub heritage: Vec<HeritageEntry>,
	pub fields: Vec<FieldDecl>,
	pub methods: Vec<MethodDecl>,
	pub properties: Vec<PropertyDecl>,
	pub loc: SourceLoc,
}

/// A property declaration: a read accessor (a field or a zero-arg method,
/// named by `getter`) and an optional write accessor (a one-arg method or a
/// field, named by `setter`). Resolved against the class's own field/method
/// tables in `analyzer_decl::link_class_bodies`.
#[derive(Debug, Clone)]
pub struct PropertyDecl {
	pub name: String,
	pub ty: TypeRef,
	pub getter: String,
	pub setter: Option<String>,
	pub is_public: bool,
	pub loc: SourceLoc,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
	pub name: String,
	pub methods: Vec<MethodSignature>,
	pub loc: SourceLoc,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
	pub name: String,
	pub ty: TypeRef,
	pub is_public: bool,
	/// `weak` modifier: only legal on a reference-typed field
	/// (`ErrorKind::WeakOnNonReference` otherwise).
	pub is_weak: bool,
	pub loc: SourceLoc,
}

#[derive(Debug, Clone)]
pub struct MethodSignature {
	pub name: String,
	pub params: Vec<ParamDecl>,
	pub return_ty: Option<TypeRef>,
	pub loc: SourceLoc,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
	pub sig: MethodSignature,
	pub is_virtual: bool,
	pub is_abstract: bool,
	pub is_override: bool,
	pub is_static: bool,
	pub is_public: bool,
	pub is_constructor: bool,
	pub is_destructor: bool,
	pub body: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct ProcDecl {
	pub sig: MethodSignature,
	pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ParamDecl {
	pub name: String,
	pub ty: TypeRef,
	pub is_var: bool,
	pub is_out: bool,
}

#[derive(Debug, Clone)]
pub struct ConstDecl {
	pub name: String,
	pub value: Expr,
	pub loc: SourceLoc,
}

#[derive(Debug, Clone)]
pub enum TypeRef {
	Named(String),
	Array(Box<TypeRef>),
	Optional(Box<TypeRef>),
}

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone)]
pub enum Stmt {
	Expr(Expr),
	VarDecl { name: String, ty: Option<TypeRef>, init: Option<Expr>, loc: SourceLoc },
	Assign { target: Expr, value: Expr, loc: SourceLoc },
	If { cond: Expr, then_branch: Block, else_branch: Option<Block>, loc: SourceLoc },
	While { cond: Expr, body: Block, loc: SourceLoc },
	For { var: String, start: Expr, end: Expr, step: Option<Expr>, body: Block, loc: SourceLoc },
	/// `for x in iterable do ...`: `var` is scoped to the loop body, typed as
	/// the iterated collection's element type, and undefined afterward.
	ForIn { var: String, iterable: Expr, body: Block, loc: SourceLoc },
	Break { loc: SourceLoc },
	Return { value: Option<Expr>, loc: SourceLoc },
	Raise { exception: Expr, loc: SourceLoc },
	Try { body: Block, handlers: Vec<ExceptHandler>, else_clause: Option<Block>, loc: SourceLoc },
	/// `case scrutinee of label, label: body ... end`, scrutinee must be
	/// ordinal (int or enum); duplicate labels after constant folding are
	/// rejected.
	Case { scrutinee: Expr, arms: Vec<CaseArm>, default: Option<Block>, loc: SourceLoc },
	/// `with receiver do ...`: pushes `receiver`'s class/record type onto the
	/// with-context stack for the duration of `body`; innermost wins on
	/// shadowing.
	With { receiver: Expr, body: Block, loc: SourceLoc },
	/// `inherited;` or `inherited Name(args);`: only legal inside a method
	/// body; resolves `Name` (or the current method if omitted) starting
	/// from the enclosing class's base chain.
	Inherited { method: Option<String>, args: Vec<Expr>, loc: SourceLoc },
}

#[derive(Debug, Clone)]
pub struct CaseArm {
	pub labels: Vec<Expr>,
	pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ExceptHandler {
	pub exception_ty: Option<TypeRef>,
	pub binding: Option<String>,
	pub body: Block,
	pub loc: SourceLoc,
}

#[derive(Debug, Clone)]
pub enum Expr {
	IntLit(i64, SourceLoc),
	FloatLit(f64, SourceLoc),
	BoolLit(bool, SourceLoc),
	StringLit(String, SourceLoc),
	NilLit(SourceLoc),
	Ident(String, SourceLoc),
	Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, loc: SourceLoc },
	Unary { op: UnOp, operand: Box<Expr>, loc: SourceLoc },
	Call { callee: Box<Expr>, args: Vec<Expr>, loc: SourceLoc },
	FieldAccess { base: Box<Expr>, field: String, loc: SourceLoc },
	Index { base: Box<Expr>, index: Box<Expr>, loc: SourceLoc },
	New { class_name: String, args: Vec<Expr>, loc: SourceLoc },
	IsNotNil { operand: Box<Expr>, loc: SourceLoc },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinOp {
	Add,
	Sub,
	Mul,
	Div,
	Mod,
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
	And,
	Or,
	/// `a ?? b`: requires type-compatible unwrapped operands, yields the
	/// unwrapped type. Lowers to a null-check diamond.
	Coalesce,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnOp {
	Neg,
	Not,
}

impl Expr {
	pub fn loc(&self) -> SourceLoc {
		match self {
			Expr::IntLit(_, loc)
			| Expr::FloatLit(_, loc)
			| Expr::BoolLit(_, loc)
			| Expr::StringLit(_, loc)
			| Expr::NilLit(loc)
			| Expr::Ident(_, loc)
			| Expr::Binary { loc, .. }
			| Expr::Unary { loc, .. }
			| Expr::Call { loc, .. }
			| Expr::FieldAccess { loc, .. }
			| Expr::Index { loc, .. }
			| Expr::New { loc, .. }
			| Expr::IsNotNil { loc, .. } => *loc,
		}
	}
}
