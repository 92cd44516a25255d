use crate::tree::NodeRef;

#[derive(Debug, Clone, PartialEq)]
pub enum PeakAlignError {
    /// The experiment collection (or an alignment parameter) is not usable.
    /// Raised before any alignment work starts.
    InvalidInput { context: String },
    /// The guide tree references something that cannot be resolved at the
    /// time the node is processed.
    MalformedTree {
        node: Option<usize>,
        reference: Option<NodeRef>,
        context: String,
    },
    /// A merge produced (or was asked to produce) an alignment whose
    /// dimensions do not add up.
    DataIntegrity { context: String },
}

impl PeakAlignError {
    pub fn invalid_input(context: impl Into<String>) -> Self {
        Self::InvalidInput {
            context: context.into(),
        }
    }

    pub fn data_integrity(context: impl Into<String>) -> Self {
        Self::DataIntegrity {
            context: context.into(),
        }
    }

    pub fn append_to_context(mut self, extra: &str) -> Self {
        match &mut self {
            PeakAlignError::InvalidInput { context }
            | PeakAlignError::MalformedTree { context, .. }
            | PeakAlignError::DataIntegrity { context } => {
                if !context.is_empty() {
                    context.push_str(": ");
                }
                context.push_str(extra);
            }
        }
        self
    }
}

impl std::fmt::Display for PeakAlignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeakAlignError::InvalidInput { context } => write!(f, "Invalid input: {}", context),
            PeakAlignError::MalformedTree {
                node,
                reference,
                context,
            } => {
                write!(f, "Malformed guide tree")?;
                if let Some(node) = node {
                    write!(f, " at node {}", node)?;
                }
                if let Some(reference) = reference {
                    write!(f, " (reference {})", reference)?;
                }
                write!(f, ": {}", context)
            }
            PeakAlignError::DataIntegrity { context } => {
                write!(f, "Alignment data integrity violated: {}", context)
            }
        }
    }
}

impl std::error::Error for PeakAlignError {}

pub type Result<T> = std::result::Result<T, PeakAlignError>;
