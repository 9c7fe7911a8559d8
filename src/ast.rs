/// AST node types for ES5 scripts.
/// Function bodies and programs carry their hoisting information so the
/// evaluator never has to rescan statements on entry.
use crate::types::JsString;
use std::rc::Rc;

/// Hoisted declarations and the statement list of a program, function body
/// or eval script.
#[derive(Clone, Debug, Default)]
pub struct Code {
    pub body: Vec<Statement>,
    /// Every `var` name declared in this scope, in source order, deduplicated.
    pub var_names: Vec<String>,
    /// Function declarations in source order; later ones win on name clashes.
    pub functions: Vec<Rc<FunctionDef>>,
    pub strict: bool,
}

#[derive(Clone, Debug)]
pub struct Program {
    pub code: Rc<Code>,
}

#[derive(Debug)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub code: Rc<Code>,
    pub source_text: String,
}

#[derive(Clone, Debug)]
pub enum Statement {
    Empty,
    Expression(Expression),
    Block(Vec<Statement>),
    Variable(Vec<VariableDeclarator>),
    If(IfStatement),
    While(WhileStatement),
    DoWhile(DoWhileStatement),
    For(ForStatement),
    ForIn(ForInStatement),
    Return(Option<Expression>),
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Expression),
    Try(TryStatement),
    Switch(SwitchStatement),
    Labeled(String, Box<Statement>),
    With(Expression, Box<Statement>),
    Debugger,
    /// Already hoisted; evaluates to an empty completion.
    FunctionDeclaration(Rc<FunctionDef>),
}

#[derive(Clone, Debug)]
pub struct VariableDeclarator {
    pub name: String,
    pub init: Option<Expression>,
}

#[derive(Clone, Debug)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    This,
    Array(Vec<Option<Expression>>),
    Object(Vec<Property>),
    Function(Rc<FunctionDef>),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Logical(LogicalOp, Box<Expression>, Box<Expression>),
    Update(UpdateOp, bool, Box<Expression>), // op, prefix, argument
    Assign(AssignOp, Box<Expression>, Box<Expression>),
    Conditional(Box<Expression>, Box<Expression>, Box<Expression>),
    Call(Box<Expression>, Vec<Expression>),
    New(Box<Expression>, Vec<Expression>),
    Member(Box<Expression>, MemberProperty),
    Typeof(Box<Expression>),
    Void(Box<Expression>),
    Delete(Box<Expression>),
    Sequence(Vec<Expression>),
}

#[derive(Clone, Debug)]
pub enum MemberProperty {
    Dot(String),
    Computed(Box<Expression>),
}

#[derive(Clone, Debug)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    RegExp(String, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LShift,
    RShift,
    URShift,
    BitAnd,
    BitOr,
    BitXor,
    In,
    Instanceof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    LShiftAssign,
    RShiftAssign,
    URShiftAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, `None` for plain `=`.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
            AssignOp::LShiftAssign => Some(BinaryOp::LShift),
            AssignOp::RShiftAssign => Some(BinaryOp::RShift),
            AssignOp::URShiftAssign => Some(BinaryOp::URShift),
            AssignOp::BitAndAssign => Some(BinaryOp::BitAnd),
            AssignOp::BitOrAssign => Some(BinaryOp::BitOr),
            AssignOp::BitXorAssign => Some(BinaryOp::BitXor),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Property {
    pub key: String,
    pub value: Expression,
    pub kind: PropertyKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    Init,
    Get,
    Set,
}

#[derive(Clone, Debug)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

#[derive(Clone, Debug)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct DoWhileStatement {
    pub test: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub enum ForInit {
    Variable(Vec<VariableDeclarator>),
    Expression(Expression),
}

#[derive(Clone, Debug)]
pub struct ForInStatement {
    pub left: ForInLeft,
    pub right: Expression,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug)]
pub enum ForInLeft {
    Variable(VariableDeclarator),
    Expression(Expression),
}

#[derive(Clone, Debug)]
pub struct TryStatement {
    pub block: Vec<Statement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Statement>>,
}

#[derive(Clone, Debug)]
pub struct CatchClause {
    pub param: String,
    pub body: Vec<Statement>,
}

#[derive(Clone, Debug)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Vec<SwitchCase>,
}

#[derive(Clone, Debug)]
pub struct SwitchCase {
    pub test: Option<Expression>,
    pub consequent: Vec<Statement>,
}

impl Expression {
    /// Expressions that produce a Reference and may appear left of `=`.
    pub fn is_reference(&self) -> bool {
        matches!(self, Expression::Identifier(_) | Expression::Member(..))
    }
}
