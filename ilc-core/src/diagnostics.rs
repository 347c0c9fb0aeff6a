//! Diagnostic record shape and the injected-emitter contract (spec §6, §7).
//!
//! The analyzer never writes to stderr directly; every error or warning is
//! built as a [`Diagnostic`] and handed to whatever [`DiagnosticEmitter`] the
//! caller supplied. [`DiagnosticSink`] is the typed convenience wrapper the
//! original's `SemanticDiagnostics` provides over a raw emitter: running
//! error/warning counters plus one constructor per [`ErrorKind`].

use std::fmt::{Debug, Display, Formatter};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Severity {
	Error,
	Warning,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct SourceLoc {
	pub file_id: u32,
	pub line: u32,
	pub column: u32,
}

/// Every diagnosable condition named in spec §7, grouped by the phase that
/// raises it. The discriminant is stable and doubles as the diagnostic code
/// suffix (`E1007` etc. are left to the text-formatting layer, out of scope
/// per §1).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, ilc_derive::FromRepr)]
#[repr(u16)]
pub enum ErrorKind {
	// Lexical (passed through from frontends; represented for completeness).
	InvalidEscape = 0,
	UnterminatedString = 1,
	UnterminatedComment = 2,
	NumericOverflow = 3,
	InvalidDigit = 4,
	UnexpectedChar = 5,

	// Name resolution.
	UndefinedIdentifier = 100,
	AmbiguousType = 101,
	UndefinedType = 102,
	UndefinedProcedure = 103,
	UnknownInterface = 104,
	UnknownExceptionType = 105,

	// Type.
	AssignmentTypeMismatch = 200,
	OperatorTypeMismatch = 201,
	NonBooleanCondition = 202,
	NonOrdinalForVar = 203,
	NonOrdinalIndex = 204,
	NilComparedWithNonOptional = 205,
	DoubleOptionalRejected = 206,

	// OO.
	OverrideWithoutVirtualBase = 300,
	SignatureMismatch = 301,
	AbstractMethodInvocation = 302,
	CannotInstantiateAbstract = 303,
	DuplicateOverload = 304,
	InterfaceNotImplemented = 305,
	AssignmentToLoopVar = 306,
	AssignmentToFunctionName = 307,
	WeakOnNonReference = 308,

	// Control.
	BreakOutsideLoop = 400,
	ExitWithValueInSub = 401,
	RaiseOutsideHandler = 402,
	ExceptElseUnsupported = 403,

	// Definite assignment.
	ReadOfUnassigned = 500,

	// Const.
	NonConstantInitializer = 600,
	ConstDivisionByZero = 601,

	// Pool allocator (runtime, surfaces only if the embedding application
	// chooses to report it as a diagnostic rather than handle the null).
	PoolAllocationFailed = 700,
}

#[derive(Debug, Clone)]
pub struct Replacement {
	pub placeholder: &'static str,
	pub value: String,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
	pub severity: Severity,
	pub kind: ErrorKind,
	pub loc: SourceLoc,
	pub length: u32,
	pub message: String,
	pub replacements: Vec<Replacement>,
}

/// Injected emitter: the analyzer and lowerer never format text themselves
/// (§1 "OUT OF SCOPE" — diagnostic-text formatting is an external concern).
pub trait DiagnosticEmitter {
	fn emit(&mut self, diag: Diagnostic);
}

/// A trivial emitter that only counts; useful in tests and as the default
/// when a caller doesn't care about diagnostic text.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
	pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticEmitter for CollectingEmitter {
	fn emit(&mut self, diag: Diagnostic) {
		self.diagnostics.push(diag);
	}
}

/// Typed convenience wrapper over an injected [`DiagnosticEmitter`], mirroring
/// the original's `SemanticDiagnostics`: forwards without altering counts,
/// and exposes one constructor per [`ErrorKind`] so call sites don't hand-
/// build `Diagnostic` literals.
pub struct DiagnosticSink<'e> {
	emitter: &'e mut dyn DiagnosticEmitter,
	error_count: usize,
	warning_count: usize,
}

impl<'e> DiagnosticSink<'e> {
	pub fn new(emitter: &'e mut dyn DiagnosticEmitter) -> Self {
		Self { emitter, error_count: 0, warning_count: 0 }
	}

	pub fn error_count(&self) -> usize {
		self.error_count
	}

	pub fn warning_count(&self) -> usize {
		self.warning_count
	}

	pub fn error(&mut self, kind: ErrorKind, loc: SourceLoc, length: u32, message: impl Into<String>) {
		self.error_count += 1;
		#[cfg(feature = "tracing")]
		tracing::debug!(?kind, ?loc, "semantic error");
		self.emitter.emit(Diagnostic {
			severity: Severity::Error,
			kind,
			loc,
			length,
			message: message.into(),
			replacements: Vec::new(),
		});
	}

	pub fn warning(&mut self, kind: ErrorKind, loc: SourceLoc, length: u32, message: impl Into<String>) {
		self.warning_count += 1;
		#[cfg(feature = "tracing")]
		tracing::debug!(?kind, ?loc, "semantic warning");
		self.emitter.emit(Diagnostic {
			severity: Severity::Warning,
			kind,
			loc,
			length,
			message: message.into(),
			replacements: Vec::new(),
		});
	}
}

impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Debug::fmt(self, f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sink_tracks_error_and_warning_counts_independently() {
		let mut emitter = CollectingEmitter::default();
		let mut sink = DiagnosticSink::new(&mut emitter);
		sink.error(ErrorKind::UndefinedIdentifier, SourceLoc::default(), 3, "undefined 'x'");
		sink.warning(ErrorKind::NonConstantInitializer, SourceLoc::default(), 1, "unused");
		sink.error(ErrorKind::AmbiguousType, SourceLoc::default(), 4, "ambiguous 'Thing'");

		assert_eq!(sink.error_count(), 2);
		assert_eq!(sink.warning_count(), 1);
		assert_eq!(emitter.diagnostics.len(), 3);
	}
}
