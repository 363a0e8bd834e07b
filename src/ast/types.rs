//! Abstract Syntax Tree (AST) types for Den's command evaluation core.
//!
//! The design follows the bash grammar while staying Rust-idiomatic:
//! sum types for compound commands, owned child nodes everywhere (no
//! raw pointers, no arena), and a `Span` carried on every token so
//! diagnostics can point at source text.

use std::fmt;

// =============================================================================
// BASE TYPES
// =============================================================================

/// Position information for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// Span in source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

// =============================================================================
// SCRIPT & STATEMENTS
// =============================================================================

/// Root node: a complete script, or one multi-line block read at a prompt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptNode {
    pub statements: Vec<StatementNode>,
}

/// A statement is a list of pipelines connected by `&&`/`||`/`;`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementNode {
    pub pipelines: Vec<PipelineNode>,
    /// Operators between pipelines, one fewer than `pipelines.len()`.
    pub operators: Vec<StatementOperator>,
    /// Run the whole statement in the background (trailing `&`).
    pub background: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOperator {
    And, // &&
    Or,  // ||
}

// =============================================================================
// PIPELINES & COMMANDS
// =============================================================================

/// A pipeline: `cmd1 | cmd2 | cmd3`, optionally negated and/or timed.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineNode {
    pub commands: Vec<CommandNode>,
    /// Negate exit status with a leading `!`.
    pub negated: bool,
    /// `time` keyword prefix.
    pub timed: bool,
    /// POSIX output format for `time -p`.
    pub time_posix: bool,
    /// Per-pipe flag: true if that stage is `|&` (redirect stderr too).
    pub pipe_stderr: Vec<bool>,
}

/// Union of all command types that can appear in a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandNode {
    Simple(SimpleCommandNode),
    Compound(CompoundCommandNode),
    FunctionDef(FunctionDefNode),
}

/// Simple command: `name args...` with optional leading assignments and
/// trailing redirections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimpleCommandNode {
    /// Variable assignments before the command name: `VAR=value cmd`.
    pub assignments: Vec<AssignmentNode>,
    /// Command name; `None` for an assignment-only simple command.
    pub name: Option<WordNode>,
    pub args: Vec<WordNode>,
    pub redirections: Vec<RedirectionNode>,
    /// Source line number, used for `$LINENO`.
    pub line: Option<usize>,
}

/// Compound commands: control structures that own a nested chain.
#[derive(Debug, Clone, PartialEq)]
pub enum CompoundCommandNode {
    If(IfNode),
    For(ForNode),
    CStyleFor(CStyleForNode),
    While(WhileNode),
    Until(UntilNode),
    Case(CaseNode),
    Select(SelectNode),
    Subshell(SubshellNode),
    Group(GroupNode),
    ArithmeticCommand(ArithmeticCommandNode),
    ConditionalCommand(ConditionalCommandNode),
}

// =============================================================================
// CONTROL FLOW
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub clauses: Vec<IfClause>,
    pub else_body: Option<Vec<StatementNode>>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Vec<StatementNode>,
    pub body: Vec<StatementNode>,
}

/// `for VAR in WORDS; do ...; done`. `words == None` means iterate `"$@"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    pub variable: String,
    pub words: Option<Vec<WordNode>>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// `for ((init; cond; step)); do ...; done`.
#[derive(Debug, Clone, PartialEq)]
pub struct CStyleForNode {
    pub init: Option<ArithmeticExpressionNode>,
    pub condition: Option<ArithmeticExpressionNode>,
    pub update: Option<ArithmeticExpressionNode>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileNode {
    pub condition: Vec<StatementNode>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UntilNode {
    pub condition: Vec<StatementNode>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseNode {
    pub word: WordNode,
    pub items: Vec<CaseItemNode>,
    pub redirections: Vec<RedirectionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseItemNode {
    pub patterns: Vec<WordNode>,
    pub body: Vec<StatementNode>,
    pub terminator: CaseTerminator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    DoubleSemi, // ;;
    SemiAnd,    // ;&
    SemiSemiAnd, // ;;&
}

/// `select VAR in WORDS; do ...; done`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectNode {
    pub variable: String,
    pub words: Option<Vec<WordNode>>,
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// `( ... )` — runs in a forked subshell, state changes are discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct SubshellNode {
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// `{ ...; }` — runs in the current shell state.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub body: Vec<StatementNode>,
    pub redirections: Vec<RedirectionNode>,
}

/// `(( expr ))`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticCommandNode {
    pub expression: ArithmeticExpressionNode,
    pub redirections: Vec<RedirectionNode>,
}

/// `[[ expr ]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalCommandNode {
    pub expression: ConditionalExpressionNode,
    pub redirections: Vec<RedirectionNode>,
}

// =============================================================================
// FUNCTIONS
// =============================================================================

/// A typed parameter in a `def name [params] -> type { ... }` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedParam {
    pub name: String,
    pub type_name: Option<String>,
}

/// Function definition: `name() { ... }`, `function name { ... }`, or
/// `def name [params] -> type { ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefNode {
    pub name: String,
    pub body: Box<CompoundCommandNode>,
    pub redirections: Vec<RedirectionNode>,
    /// Present only for `def` definitions.
    pub typed_params: Option<Vec<TypedParam>>,
    pub return_type: Option<String>,
    /// Script file the function was defined in, for `BASH_SOURCE`.
    pub source_file: Option<String>,
}

// =============================================================================
// ASSIGNMENTS
// =============================================================================

/// `VAR=value` or `VAR+=value`, possibly an array literal.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentNode {
    pub name: String,
    /// `Some(subscript)` for `VAR[i]=value` / associative-array assignment.
    pub subscript: Option<WordNode>,
    pub value: Option<WordNode>,
    pub append: bool,
    /// `VAR=(a b c)` or `VAR=([k]=v ...)`.
    pub array: Option<Vec<ArrayElementNode>>,
}

/// One element of an array-literal assignment; `key` is set for
/// `[index]=value` / associative-array `[key]=value` forms.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayElementNode {
    pub key: Option<WordNode>,
    pub value: WordNode,
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RedirectionNode {
    /// Source file descriptor; `None` means the operator's default (0/1).
    pub fd: Option<i32>,
    /// `{varname}>file` form: assign the allocated fd to this variable.
    pub fd_variable: Option<String>,
    pub operator: RedirectionOperator,
    pub target: RedirectionTarget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedirectionTarget {
    Word(WordNode),
    HereDoc(HereDocNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionOperator {
    Less,      // <
    Great,     // >
    DGreat,    // >>
    GreatAnd,  // >&
    LessAnd,   // <&
    LessGreat, // <>
    Clobber,   // >|
    AndGreat,  // &>
    AndDGreat, // &>>
    TLess,     // <<<
    DLess,     // <<
    DLessDash, // <<-
}

impl fmt::Display for RedirectionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Less => "<",
            Self::Great => ">",
            Self::DGreat => ">>",
            Self::GreatAnd => ">&",
            Self::LessAnd => "<&",
            Self::LessGreat => "<>",
            Self::Clobber => ">|",
            Self::AndGreat => "&>",
            Self::AndDGreat => "&>>",
            Self::TLess => "<<<",
            Self::DLess => "<<",
            Self::DLessDash => "<<-",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HereDocNode {
    pub delimiter: String,
    pub content: WordNode,
    /// `<<-`: strip leading tabs from body lines and the delimiter line.
    pub strip_tabs: bool,
    /// Quoted delimiter: body undergoes no expansion.
    pub quoted: bool,
}

// =============================================================================
// WORDS — the heart of shell parsing
// =============================================================================

/// A word is a sequence of parts; quoted-ness lives on the parts
/// themselves and survives into expansion, never collapsed early.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WordNode {
    pub parts: Vec<WordPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    Literal(LiteralPart),
    SingleQuoted(SingleQuotedPart),
    DoubleQuoted(DoubleQuotedPart),
    Escaped(EscapedPart),
    ParameterExpansion(ParameterExpansionPart),
    CommandSubstitution(CommandSubstitutionPart),
    ArithmeticExpansion(ArithmeticExpansionPart),
    ProcessSubstitution(ProcessSubstitutionPart),
    BraceExpansion(BraceExpansionPart),
    TildeExpansion(TildeExpansionPart),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralPart {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleQuotedPart {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoubleQuotedPart {
    pub parts: Vec<WordPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapedPart {
    pub value: String,
}

// =============================================================================
// PARAMETER EXPANSION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterExpansionPart {
    pub parameter: String,
    /// `Some(i)` / `Some("@")` / `Some("*")` for `${NAME[i]}` forms.
    pub index: Option<ParameterIndex>,
    pub operation: Option<ParameterOperation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterIndex {
    Expr(Box<ArithExpr>),
    All,     // [@]
    Joined,  // [*]
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterOperation {
    DefaultValue(DefaultValueOp),
    AssignDefault(AssignDefaultOp),
    ErrorIfUnset(ErrorIfUnsetOp),
    UseAlternative(UseAlternativeOp),
    Length(LengthOp),
    Substring(SubstringOp),
    PatternRemoval(PatternRemovalOp),
    PatternReplacement(PatternReplacementOp),
    CaseModification(CaseModificationOp),
    Transform(TransformOp),
    Indirection(IndirectionOp),
    ArrayKeys(ArrayKeysOp),
    VarNamePrefix(VarNamePrefixOp),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthOp;

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValueOp {
    pub word: WordNode,
    pub check_empty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignDefaultOp {
    pub word: WordNode,
    pub check_empty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorIfUnsetOp {
    pub word: Option<WordNode>,
    pub check_empty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseAlternativeOp {
    pub word: WordNode,
    pub check_empty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubstringOp {
    pub offset: ArithmeticExpressionNode,
    pub length: Option<ArithmeticExpressionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternRemovalOp {
    pub pattern: WordNode,
    pub side: PatternRemovalSide,
    pub greedy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternRemovalSide {
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternReplacementOp {
    pub pattern: WordNode,
    pub replacement: Option<WordNode>,
    pub all: bool,
    pub anchor: Option<PatternAnchor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternAnchor {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseModificationOp {
    pub direction: CaseDirection,
    pub all: bool,
    pub pattern: Option<WordNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseDirection {
    Upper,
    Lower,
}

/// `${var@Q}`, `${var@A}`, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOp {
    pub operator: TransformOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOperator {
    Q, // quote
    P, // expand as prompt string
    A, // declare-style reconstruction
    K, // key/value listing
    E, // interpret backslash escapes
    U, // uppercase
    L, // lowercase
}

/// `${!VAR}` — indirect expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectionOp;

/// `${!arr[@]}` / `${!arr[*]}` — array keys/indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayKeysOp {
    pub array: String,
    pub star: bool,
}

/// `${!prefix*}` / `${!prefix@}` — variable names matching a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarNamePrefixOp {
    pub prefix: String,
    pub star: bool,
}

// =============================================================================
// COMMAND SUBSTITUTION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CommandSubstitutionPart {
    pub body: ScriptNode,
    /// Legacy `` `cmd` `` syntax vs `$(cmd)`.
    pub legacy: bool,
}

// =============================================================================
// ARITHMETIC
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticExpansionPart {
    pub expression: ArithmeticExpressionNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticExpressionNode {
    pub expression: ArithExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArithExpr {
    Number(i64),
    /// `0x..`/`0NNN`/`base#digits` literals keep their original text so
    /// errors can quote it verbatim.
    Variable(String),
    ArrayElement { array: String, index: Box<ArithExpr> },
    Binary(Box<ArithBinaryNode>),
    Unary(Box<ArithUnaryNode>),
    Ternary(Box<ArithTernaryNode>),
    Assignment(Box<ArithAssignmentNode>),
    Group(Box<ArithExpr>),
    /// A parsed `$(...)`/backtick nested inside an arithmetic context.
    CommandSubst(ScriptNode),
    Sequence(Vec<ArithExpr>), // comma operator
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithBinaryOperator {
    Add, Sub, Mul, Div, Mod, Pow,
    LShift, RShift,
    Lt, Le, Gt, Ge, Eq, Ne,
    BitAnd, BitOr, BitXor,
    LogAnd, LogOr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithBinaryNode {
    pub operator: ArithBinaryOperator,
    pub left: ArithExpr,
    pub right: ArithExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithUnaryOperator {
    Neg, Pos, Not, BitNot,
    PreInc, PreDec, PostInc, PostDec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithUnaryNode {
    pub operator: ArithUnaryOperator,
    pub operand: ArithExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithTernaryNode {
    pub condition: ArithExpr,
    pub consequent: ArithExpr,
    pub alternate: ArithExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithAssignmentOperator {
    Assign, AddAssign, SubAssign, MulAssign, DivAssign, ModAssign,
    LShiftAssign, RShiftAssign, AndAssign, OrAssign, XorAssign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithAssignmentNode {
    pub operator: ArithAssignmentOperator,
    pub variable: String,
    pub subscript: Option<Box<ArithExpr>>,
    pub value: ArithExpr,
}

// =============================================================================
// PROCESS SUBSTITUTION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSubstitutionPart {
    pub body: ScriptNode,
    pub direction: ProcessDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessDirection {
    Input,  // <(...)
    Output, // >(...)
}

// =============================================================================
// BRACE & TILDE EXPANSION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BraceExpansionPart {
    pub items: Vec<BraceItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BraceItem {
    Word(WordNode),
    Range {
        start: BraceRangeValue,
        end: BraceRangeValue,
        step: Option<i64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraceRangeValue {
    Number(i64),
    Char(char),
}

impl fmt::Display for BraceRangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Char(c) => write!(f, "{}", c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TildeExpansionPart {
    pub user: Option<String>,
}

// =============================================================================
// CONDITIONAL EXPRESSIONS (for `[[ ]]`)
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalExpressionNode {
    Binary(CondBinaryNode),
    Unary(CondUnaryNode),
    Not(Box<ConditionalExpressionNode>),
    And(Box<ConditionalExpressionNode>, Box<ConditionalExpressionNode>),
    Or(Box<ConditionalExpressionNode>, Box<ConditionalExpressionNode>),
    Group(Box<ConditionalExpressionNode>),
    Word(WordNode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondBinaryOperator {
    Eq,    // = or ==
    Ne,    // !=
    Match, // =~
    Lt,    // <
    Gt,    // >
    NumEq, // -eq
    NumNe, // -ne
    NumLt, // -lt
    NumLe, // -le
    NumGt, // -gt
    NumGe, // -ge
    Nt,    // -nt
    Ot,    // -ot
    Ef,    // -ef
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondBinaryNode {
    pub operator: CondBinaryOperator,
    pub left: WordNode,
    pub right: WordNode,
}

/// Unary test operators, named after their bash flag letter
/// (`-e`, `-f`, `-d`, ... and the special `-v`, `-z`, `-n`, `-o`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondUnaryOperator {
    ExistsAny,    // -e
    RegularFile,  // -f
    Directory,    // -d
    Symlink,      // -L / -h
    Readable,     // -r
    Writable,     // -w
    Executable,   // -x
    NonEmpty,     // -s
    Socket,       // -S
    Pipe,         // -p
    BlockSpecial,   // -b
    CharSpecial,    // -c
    SetUid,       // -u
    SetGid,       // -g
    Sticky,       // -k
    Terminal,     // -t (operand is an fd number)
    StringEmpty,  // -z
    StringNonEmpty, // -n
    OptionSet,    // -o
    VarSet,       // -v
    NameRef,      // -R
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondUnaryNode {
    pub operator: CondUnaryOperator,
    pub operand: WordNode,
}

// =============================================================================
// FACTORY HELPERS
// =============================================================================

impl WordNode {
    pub fn new(parts: Vec<WordPart>) -> Self {
        Self { parts }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self { parts: vec![WordPart::Literal(LiteralPart { value: value.into() })] }
    }

    /// True if every part is a literal or escaped byte (no expansion of
    /// any kind will touch this word).
    pub fn is_plain(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, WordPart::Literal(_) | WordPart::Escaped(_)))
    }

    /// True if the whole word is a single unbroken single-quoted span.
    pub fn is_fully_single_quoted(&self) -> bool {
        matches!(self.parts.as_slice(), [WordPart::SingleQuoted(_)])
    }
}
