//! Fixed-order request steps.
//!
//! Every inbound call walks the same nine steps before the method runs.
//! The order cannot be changed; a step that fails terminates the call.

/// One step of the request state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Step {
    /// Step 1: utility actions skip everything else
    Bypass = 1,
    /// Step 2: secure channel and POST
    Transport = 2,
    /// Step 3: inline method or attached action
    Target = 3,
    /// Step 4: JSON body
    Body = 4,
    /// Step 5: contract extraction or cache hit
    Contract = 5,
    /// Step 6: `@api` marker
    Exposure = 6,
    /// Step 7: authentication and permission
    Authorization = 7,
    /// Step 8: parameter validation and binding
    Parameters = 8,
    /// Step 9: transaction acquisition
    Transaction = 9,
}

impl Step {
    /// Returns the step name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bypass => "bypass",
            Self::Transport => "transport",
            Self::Target => "target",
            Self::Body => "body",
            Self::Contract => "contract",
            Self::Exposure => "exposure",
            Self::Authorization => "authorization",
            Self::Parameters => "parameters",
            Self::Transaction => "transaction",
        }
    }

    /// Returns all steps in order.
    #[must_use]
    pub const fn all() -> [Self; 9] {
        [
            Self::Bypass,
            Self::Transport,
            Self::Target,
            Self::Body,
            Self::Contract,
            Self::Exposure,
            Self::Authorization,
            Self::Parameters,
            Self::Transaction,
        ]
    }
}
