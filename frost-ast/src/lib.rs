use frost_diagnostics::Span;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A parsed source file: an ordered list of top-level statements.
pub type File = Vec<Statement>;

/// Visibility of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Privacy {
    Public,
    Private,
}

impl Default for Privacy {
    fn default() -> Self {
        Privacy::Public
    }
}

/// Attributes recognized by the middle-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Attribute {
    /// Suppress body generation
    Builtin,
    /// Use the bare identifier as the linkage symbol
    NoMangle,
    /// Force the linkage symbol (`name = ...`) or export a macro
    Export,
    /// Import macros on an import statement
    Macros,
    /// Mark the symbol as unit-private
    InternalLinkage,
    /// Function body is an inline IR chunk sequence
    LlvmFunc,
    AllowForTest,
    AllowForBench,
    /// Required for raw pointer arithmetic and inline-IR calls
    Unsafe,
}

pub type AttributeArgs = BTreeMap<String, String>;

/// Attribute set attached to a declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    entries: Vec<(Attribute, AttributeArgs)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attr: Attribute, args: AttributeArgs) {
        self.entries.push((attr, args));
    }

    pub fn with(mut self, attr: Attribute) -> Self {
        self.add(attr, AttributeArgs::new());
        self
    }

    pub fn has(&self, attr: Attribute) -> bool {
        self.entries.iter().any(|(a, _)| *a == attr)
    }

    pub fn args(&self, attr: Attribute) -> Option<&AttributeArgs> {
        self.entries.iter().find(|(a, _)| *a == attr).map(|(_, v)| v)
    }
}

/// Reference to a (possibly generic, possibly qualified) type in source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    pub kind: TypeRefKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeRefKind {
    /// `A`, `std::String`, `Map<K, V>`
    Name {
        path: Vec<String>,
        generics: Vec<TypeRef>,
    },
    /// `*T` / `*const T`
    Pointer { inner: Box<TypeRef>, mutable: bool },
    /// `&T` / `&mut T`
    Reference { inner: Box<TypeRef>, mutable: bool },
    /// `func(A, B) -> R`
    Function {
        args: Vec<TypeRef>,
        ret: Box<TypeRef>,
        variadic: bool,
    },
}

impl TypeRef {
    pub fn name(name: &str, span: Span) -> Self {
        Self {
            kind: TypeRefKind::Name {
                path: name.split("::").map(str::to_string).collect(),
                generics: Vec::new(),
            },
            span,
        }
    }

    pub fn generic(name: &str, generics: Vec<TypeRef>, span: Span) -> Self {
        Self {
            kind: TypeRefKind::Name {
                path: name.split("::").map(str::to_string).collect(),
                generics,
            },
            span,
        }
    }

    /// Human-readable form for diagnostics
    pub fn pretty_name(&self) -> String {
        match &self.kind {
            TypeRefKind::Name { path, generics } => {
                let mut out = path.join("::");
                if !generics.is_empty() {
                    out.push('<');
                    for (i, g) in generics.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(&g.pretty_name());
                    }
                    out.push('>');
                }
                out
            }
            TypeRefKind::Pointer { inner, mutable } => {
                format!(
                    "*{} {}",
                    if *mutable { "mut" } else { "const" },
                    inner.pretty_name()
                )
            }
            TypeRefKind::Reference { inner, mutable } => {
                format!("&{}{}", if *mutable { "mut " } else { "" }, inner.pretty_name())
            }
            TypeRefKind::Function { args, ret, variadic } => {
                let mut a: Vec<String> = args.iter().map(|t| t.pretty_name()).collect();
                if *variadic {
                    a.push("...".to_string());
                }
                format!("func({}) -> {}", a.join(", "), ret.pretty_name())
            }
        }
    }
}

/// Generic type parameter: `T`, `T: Sized`, `T = i32`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,
    /// Where-clause predicates the bound type must satisfy
    pub bounds: Vec<TypeRef>,
    /// Default type used when the argument is omitted
    pub default: Option<TypeRef>,
    pub span: Span,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<Expression>,
}

/// How a function body is given
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    Bodied(Block),
    /// Declaration only; resolved by the linker
    Extern,
    /// Inline low-level IR: literal chunks interleaved with type accesses
    LlvmIr(Vec<IrChunk>),
}

/// A fragment of an inline low-level IR body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrChunk {
    Code(String),
    TypeAccess(TypeRef),
}

/// Function definition. Operator methods carry `#<symbol>` identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub params: Vec<Param>,
    /// `None` means void
    pub ret: Option<TypeRef>,
    pub body: FunctionBody,
    pub privacy: Privacy,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_mutable: bool,
    pub is_variadic: bool,
    /// Raw symbol override, set by the driver for entry points
    pub external_name: Option<String>,
    pub attributes: Attributes,
    pub span: Span,
}

impl FunctionDef {
    pub fn new(name: &str, span: Span) -> Self {
        Self {
            name: name.to_string(),
            generics: Vec::new(),
            params: Vec::new(),
            ret: None,
            body: FunctionBody::Bodied(Block {
                statements: Vec::new(),
                span: span.clone(),
            }),
            privacy: Privacy::Public,
            is_static: false,
            is_virtual: false,
            is_override: false,
            is_mutable: false,
            is_variadic: false,
            external_name: None,
            attributes: Attributes::new(),
            span,
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }
}

/// Variable declaration; also used for class fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub ty: Option<TypeRef>,
    pub value: Option<Expression>,
    pub mutable: bool,
    pub privacy: Privacy,
    pub span: Span,
}

/// Class, struct or interface definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub parent: Option<TypeRef>,
    /// Interfaces named in the `implements` clause
    pub impls: Vec<TypeRef>,
    pub fields: Vec<VariableDecl>,
    pub methods: Vec<FunctionDef>,
    pub type_aliases: Vec<TypeAliasDef>,
    pub is_struct: bool,
    pub is_interface: bool,
    pub privacy: Privacy,
    pub attributes: Attributes,
    pub span: Span,
}

impl ClassDef {
    pub fn new(name: &str, span: Span) -> Self {
        Self {
            name: name.to_string(),
            generics: Vec::new(),
            parent: None,
            impls: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            type_aliases: Vec::new(),
            is_struct: false,
            is_interface: false,
            privacy: Privacy::Public,
            attributes: Attributes::new(),
            span,
        }
    }
}

/// `type Name<T> = Base`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAliasDef {
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub ty: TypeRef,
    pub privacy: Privacy,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,
    pub payload: Vec<TypeRef>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub variants: Vec<EnumVariant>,
    pub privacy: Privacy,
    pub span: Span,
}

/// Macro definition; the body is re-expanded at call sites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    pub attributes: Attributes,
    pub span: Span,
}

/// `import pkg::a::b` (optionally `as name`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub package: String,
    pub path: Vec<String>,
    /// User override for the bound name (`as` clause)
    pub export_symbol: Option<String>,
    pub attributes: Attributes,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub condition: Expression,
    pub then_block: Block,
    pub else_block: Option<Block>,
    pub span: Span,
}

/// While, do-while, and lowered for-loops. A for-loop arrives here as a
/// while with a trailing `step` expression executed at the end of the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileLoop {
    pub condition: Expression,
    pub body: Block,
    pub is_do_while: bool,
    pub step: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub value: Option<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Throw {
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub var: VariableDecl,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryCatch {
    pub block: Block,
    pub catches: Vec<CatchClause>,
    pub span: Span,
}

/// Pattern case over an enum variant: `case Some(x): { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCase {
    pub variant: String,
    pub bindings: Vec<String>,
    pub block: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwitchKind {
    /// Exhaustive match over enum variants
    Pattern { cases: Vec<PatternCase> },
    /// C-style switch over integral expressions
    CStyle {
        cases: Vec<(Expression, Block)>,
        default: Option<Block>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub value: Expression,
    pub kind: SwitchKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopFlowKind {
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopFlow {
    pub kind: LoopFlowKind,
    pub span: Span,
}

/// Statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Block(Block),
    FunctionDef(FunctionDef),
    VariableDecl(VariableDecl),
    ClassDef(ClassDef),
    TypeAlias(TypeAliasDef),
    EnumDef(EnumDef),
    MacroDef(MacroDef),
    Import(Import),
    Namespace(Namespace),
    Conditional(Conditional),
    WhileLoop(WhileLoop),
    Switch(Switch),
    TryCatch(TryCatch),
    Return(Return),
    Throw(Throw),
    LoopFlow(LoopFlow),
    Expression(Expression),
}

impl Statement {
    pub fn span(&self) -> &Span {
        match self {
            Statement::Block(x) => &x.span,
            Statement::FunctionDef(x) => &x.span,
            Statement::VariableDecl(x) => &x.span,
            Statement::ClassDef(x) => &x.span,
            Statement::TypeAlias(x) => &x.span,
            Statement::EnumDef(x) => &x.span,
            Statement::MacroDef(x) => &x.span,
            Statement::Import(x) => &x.span,
            Statement::Namespace(x) => &x.span,
            Statement::Conditional(x) => &x.span,
            Statement::WhileLoop(x) => &x.span,
            Statement::Switch(x) => &x.span,
            Statement::TryCatch(x) => &x.span,
            Statement::Return(x) => &x.span,
            Statement::Throw(x) => &x.span,
            Statement::LoopFlow(x) => &x.span,
            Statement::Expression(x) => x.span(),
        }
    }
}

/// Literal kinds; the literal text is kept raw (quotes, radix and suffix
/// letters included) and decoded by the transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstantKind {
    String,
    Number,
    Float,
    Bool,
    Char,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantValue {
    pub kind: ConstantKind,
    pub value: String,
    /// Literal prefix (`b` for byte strings); empty when absent
    pub prefix: String,
    pub span: Span,
}

/// Identifier, optionally with explicit generic arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub generics: Vec<TypeRef>,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: &str, span: Span) -> Self {
        Self {
            name: name.to_string(),
            generics: Vec::new(),
            span,
        }
    }
}

/// `a.b` (dynamic) or `A::b` (static) member access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub base: Box<Expression>,
    pub identifier: Identifier,
    pub is_static: bool,
    pub span: Span,
}

/// Binary and assignment operators. `symbol()` yields the `#`-token form
/// used for operator method identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    Assign,
    PlusAssign,
    MinusAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl OpType {
    pub fn symbol(&self) -> &'static str {
        match self {
            OpType::Assign => "=",
            OpType::PlusAssign => "+=",
            OpType::MinusAssign => "-=",
            OpType::MulAssign => "*=",
            OpType::DivAssign => "/=",
            OpType::ModAssign => "%=",
            OpType::Plus => "+",
            OpType::Minus => "-",
            OpType::Mul => "*",
            OpType::Div => "/",
            OpType::Mod => "%",
            OpType::EqEq => "==",
            OpType::NotEq => "!=",
            OpType::Lt => "<",
            OpType::Gt => ">",
            OpType::LtEq => "<=",
            OpType::GtEq => ">=",
            OpType::And => "&&",
            OpType::Or => "||",
            OpType::BitAnd => "&",
            OpType::BitOr => "|",
            OpType::BitXor => "^",
            OpType::Shl => "<<",
            OpType::Shr => ">>",
        }
    }

    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            OpType::Assign
                | OpType::PlusAssign
                | OpType::MinusAssign
                | OpType::MulAssign
                | OpType::DivAssign
                | OpType::ModAssign
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOp {
    pub op: OpType,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub callee: Box<Expression>,
    pub args: Vec<Expression>,
    pub span: Span,
}

/// `new T(args)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInstance {
    pub ty: TypeRef,
    pub args: Vec<Expression>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cast {
    pub value: Box<Expression>,
    pub target: TypeRef,
    pub span: Span,
}

/// Anonymous function literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    pub func: FunctionDef,
    pub span: Span,
}

/// `#name` inside macro bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudoVariable {
    pub name: String,
    pub span: Span,
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Constant(ConstantValue),
    Identifier(Identifier),
    Index(Index),
    BinaryOp(BinaryOp),
    FunctionCall(FunctionCall),
    NewInstance(NewInstance),
    Cast(Cast),
    Lambda(Lambda),
    PseudoVariable(PseudoVariable),
    TypeRef(TypeRef),
}

impl Expression {
    pub fn span(&self) -> &Span {
        match self {
            Expression::Constant(x) => &x.span,
            Expression::Identifier(x) => &x.span,
            Expression::Index(x) => &x.span,
            Expression::BinaryOp(x) => &x.span,
            Expression::FunctionCall(x) => &x.span,
            Expression::NewInstance(x) => &x.span,
            Expression::Cast(x) => &x.span,
            Expression::Lambda(x) => &x.span,
            Expression::PseudoVariable(x) => &x.span,
            Expression::TypeRef(x) => &x.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::unknown()
    }

    #[test]
    fn test_type_ref_pretty_names() {
        let inner = TypeRef::name("i32", span());
        let r = TypeRef {
            kind: TypeRefKind::Reference {
                inner: Box::new(inner.clone()),
                mutable: true,
            },
            span: span(),
        };
        assert_eq!(r.pretty_name(), "&mut i32");

        let f = TypeRef {
            kind: TypeRefKind::Function {
                args: vec![inner],
                ret: Box::new(TypeRef::name("bool", span())),
                variadic: true,
            },
            span: span(),
        };
        assert_eq!(f.pretty_name(), "func(i32, ...) -> bool");

        let g = TypeRef::generic("Map", vec![TypeRef::name("i32", span())], span());
        assert_eq!(g.pretty_name(), "Map<i32>");
    }

    #[test]
    fn test_operator_symbols() {
        assert!(OpType::Assign.is_assignment());
        assert!(OpType::PlusAssign.is_assignment());
        assert!(!OpType::EqEq.is_assignment());
        assert_eq!(OpType::Shl.symbol(), "<<");
    }

    #[test]
    fn test_serialization_round_trip() {
        let file: File = vec![Statement::VariableDecl(VariableDecl {
            name: "x".to_string(),
            ty: Some(TypeRef::name("i32", span())),
            value: None,
            mutable: false,
            privacy: Privacy::Private,
            span: span(),
        })];

        let json = serde_json::to_string(&file).unwrap();
        let back: File = serde_json::from_str(&json).unwrap();
        assert_eq!(file, back);
    }
}
