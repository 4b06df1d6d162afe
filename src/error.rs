use thiserror::Error;

macro_rules! structural_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::StructuralInvariant {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::StructuralInvariant {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all possible error conditions that can occur while lifting a bytecode
/// procedure into a structured AST. Each variant provides specific context about the failure
/// mode to enable appropriate error handling. An error always aborts only the procedure being
/// compiled; batch APIs report one `Result` per procedure.
///
/// # Error Categories
///
/// ## Input Rejection
/// - [`Error::UnsupportedConstruct`] - Instruction or control pattern outside the supported subset
/// - [`Error::MutatingImmutableValue`] - The input program violates the mutability discipline
/// - [`Error::GraphError`] - Malformed procedure handed over by the front-end
///
/// ## Internal Invariants
/// - [`Error::StructuralInvariant`] - A structural recovery invariant was broken (a bug)
///
/// # Examples
///
/// ```rust,no_run
/// use shadelift::{decompile, Error, NullOracle};
/// # let procedure = unimplemented!();
///
/// match decompile(&procedure, &NullOracle) {
///     Ok(ast) => println!("{}", ast),
///     Err(Error::MutatingImmutableValue { message }) => {
///         eprintln!("rejected: {}", message);
///     }
///     Err(Error::StructuralInvariant { message, file, line }) => {
///         eprintln!("internal error: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The procedure uses an instruction or control pattern outside the supported subset.
    ///
    /// Raised when the front-end hands over a construct the pipeline does not model,
    /// such as computed jumps or irreducible flow the recovery passes cannot express.
    /// Fatal for the affected procedure.
    #[error("Unsupported construct: {message}")]
    UnsupportedConstruct {
        /// Description of the unsupported construct
        message: String,
    },

    /// A structural recovery invariant was violated.
    ///
    /// This error indicates a bug in the recovery passes rather than bad input:
    /// sub-bodies that are not a disjoint partition of their parent body, a flow
    /// graph without a unique start node after construction, or a loop that still
    /// has several entries after dispatch synthesis. The error includes the source
    /// location where the violation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of the violated invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Structural invariant - {file}:{line}: {message}")]
    StructuralInvariant {
        /// The message to be printed for the invariant violation
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The input program mutates a value the mutability discipline marks immutable.
    ///
    /// Raised fail-fast from the mutability analysis when an assignment targets a
    /// forbidden location, or an immutable value is passed in an argument position
    /// the mutation oracle reports as mutated. This is a semantic rejection of the
    /// input, not an internal error.
    #[error("Mutating immutable value: {message}")]
    MutatingImmutableValue {
        /// Description of the offending mutation
        message: String,
    },

    /// Flow graph construction error.
    ///
    /// Errors detected while wiring the control flow graph from front-end basic
    /// blocks: successor indices out of range, jumps to unknown labels, or an
    /// empty procedure body.
    #[error("{0}")]
    GraphError(String),
}
