//! Function shape description and validation.
//!
//! A [`FunctionBinding`] is derived once, when a handler is built, from the
//! [`Signature`] a typed function reports through
//! [`HandlerFn`](crate::handler::HandlerFn). It records how many inputs and
//! outputs the function has and which role every input plays, and it refuses
//! shapes that the calling convention cannot serve:
//!
//! | inputs | position 0 | position 1 | position 2 |
//! |---|---|---|---|
//! | 0 | - | - | - |
//! | 1 | any role | - | - |
//! | 2 | ExecutionContext | HeaderBag or Payload | - |
//! | 3 | ExecutionContext | HeaderBag | Payload |

use crate::error::ConfigError;

/// Maximum number of input parameters.
pub const MAX_INPUT_ARGS: usize = 3;

/// Maximum number of outputs.
pub const MAX_OUTPUT_ARGS: usize = 2;

/// Role of an input parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRole {
    /// The request-scoped, cancellation-aware context.
    ExecutionContext,
    /// The per-request header bag.
    HeaderBag,
    /// A value decoded from the request body.
    Payload,
}

/// Role of a single output slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputRole {
    /// A value serialized into the response body.
    Value,
    /// An error routed to the error reporter.
    Error,
}

/// How a function's return value is turned into a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// No outputs: 200 with an empty body.
    Nothing,
    /// A single value.
    Value,
    /// A single error slot.
    Error,
    /// A value and an error slot.
    ValueAndError,
}

impl ReturnShape {
    /// Number of outputs this shape stands for.
    pub fn arity(self) -> usize {
        match self {
            ReturnShape::Nothing => 0,
            ReturnShape::Value | ReturnShape::Error => 1,
            ReturnShape::ValueAndError => 2,
        }
    }
}

/// Raw, unvalidated function shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub inputs: Vec<ParamRole>,
    pub outputs: Vec<OutputRole>,
}

impl Signature {
    /// Describe a function by its input roles and output roles, in order.
    pub fn new(inputs: Vec<ParamRole>, outputs: Vec<OutputRole>) -> Self {
        Self { inputs, outputs }
    }
}

/// Validated, immutable shape of a wrapped function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionBinding {
    name: String,
    inputs: Vec<ParamRole>,
    returns: ReturnShape,
}

impl FunctionBinding {
    /// Validate `signature` and freeze it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::TooManyInputArgs`] / [`ConfigError::TooManyOutputArgs`] when
    /// the arity bounds are exceeded, and a role error when a parameter sits at a
    /// position the calling convention does not allow.
    pub fn new(name: impl Into<String>, signature: Signature) -> Result<Self, ConfigError> {
        let Signature { inputs, outputs } = signature;
        check_arity(inputs.len(), outputs.len())?;
        check_positions(&inputs)?;

        let returns = match outputs.as_slice() {
            [] => ReturnShape::Nothing,
            [OutputRole::Value] => ReturnShape::Value,
            [OutputRole::Error] => ReturnShape::Error,
            [OutputRole::Value, OutputRole::Error] => ReturnShape::ValueAndError,
            _ => return Err(ConfigError::MisplacedErrorSlot),
        };

        Ok(Self {
            name: name.into(),
            inputs,
            returns,
        })
    }

    /// Type name of the wrapped function.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of parameters the function takes.
    #[inline]
    pub fn input_arg_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of outputs the function returns, counting the error slot.
    #[inline]
    pub fn output_arg_count(&self) -> usize {
        self.returns.arity()
    }

    /// Roles of all inputs, in call order.
    pub fn inputs(&self) -> &[ParamRole] {
        &self.inputs
    }

    /// Role of the input at `position`.
    pub fn role(&self, position: usize) -> Option<ParamRole> {
        self.inputs.get(position).copied()
    }

    pub fn returns(&self) -> ReturnShape {
        self.returns
    }

    /// Position of the input decoded from the request body, if any.
    pub fn payload_position(&self) -> Option<usize> {
        self.inputs.iter().rposition(|r| *r == ParamRole::Payload)
    }

    /// Re-check the role ordering.
    pub fn check_positions(&self) -> Result<(), ConfigError> {
        check_positions(&self.inputs)
    }
}

/// Check the arity bounds shared by every codec.
pub fn check_arity(inputs: usize, outputs: usize) -> Result<(), ConfigError> {
    if inputs > MAX_INPUT_ARGS {
        return Err(ConfigError::TooManyInputArgs);
    }
    if outputs > MAX_OUTPUT_ARGS {
        return Err(ConfigError::TooManyOutputArgs);
    }
    Ok(())
}

fn check_positions(inputs: &[ParamRole]) -> Result<(), ConfigError> {
    if inputs.len() >= 2 && inputs[0] != ParamRole::ExecutionContext {
        return Err(ConfigError::UnexpectedRole {
            position: 0,
            expected: ParamRole::ExecutionContext,
            found: inputs[0],
        });
    }

    for (position, role) in inputs.iter().enumerate() {
        if inputs[..position].contains(role) {
            return Err(ConfigError::DuplicateRole {
                role: *role,
                position,
            });
        }
    }

    if let [_, second, third] = inputs {
        if *second != ParamRole::HeaderBag {
            return Err(ConfigError::UnexpectedRole {
                position: 1,
                expected: ParamRole::HeaderBag,
                found: *second,
            });
        }
        if *third != ParamRole::Payload {
            return Err(ConfigError::UnexpectedRole {
                position: 2,
                expected: ParamRole::Payload,
                found: *third,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ParamRole::*;

    fn bind(inputs: Vec<ParamRole>, outputs: Vec<OutputRole>) -> Result<FunctionBinding, ConfigError> {
        FunctionBinding::new("test_fn", Signature::new(inputs, outputs))
    }

    #[test]
    fn test_accepts_every_documented_shape() {
        let shapes = vec![
            vec![],
            vec![ExecutionContext],
            vec![HeaderBag],
            vec![Payload],
            vec![ExecutionContext, HeaderBag],
            vec![ExecutionContext, Payload],
            vec![ExecutionContext, HeaderBag, Payload],
        ];
        let outputs = vec![
            vec![],
            vec![OutputRole::Value],
            vec![OutputRole::Error],
            vec![OutputRole::Value, OutputRole::Error],
        ];

        for inputs in &shapes {
            for out in &outputs {
                let binding = bind(inputs.clone(), out.clone()).unwrap();
                assert_eq!(binding.input_arg_count(), inputs.len());
                assert_eq!(binding.output_arg_count(), out.len());
                assert_eq!(binding.inputs(), inputs.as_slice());
            }
        }
    }

    #[test]
    fn test_too_many_inputs() {
        let err = bind(vec![ExecutionContext, HeaderBag, Payload, Payload], vec![]).unwrap_err();
        assert_eq!(err, ConfigError::TooManyInputArgs);
    }

    #[test]
    fn test_too_many_outputs() {
        let err = bind(
            vec![],
            vec![OutputRole::Value, OutputRole::Value, OutputRole::Error],
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::TooManyOutputArgs);
    }

    #[test]
    fn test_context_must_lead_two_args() {
        let err = bind(vec![Payload, ExecutionContext], vec![]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnexpectedRole {
                position: 0,
                expected: ExecutionContext,
                found: Payload,
            }
        );

        let err = bind(vec![HeaderBag, Payload], vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::UnexpectedRole { position: 0, .. }));
    }

    #[test]
    fn test_duplicate_context() {
        let err = bind(vec![ExecutionContext, ExecutionContext], vec![]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateRole {
                role: ExecutionContext,
                position: 1,
            }
        );
    }

    #[test]
    fn test_three_args_need_header_then_payload() {
        let err = bind(vec![ExecutionContext, Payload, HeaderBag], vec![]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnexpectedRole {
                position: 1,
                expected: HeaderBag,
                found: Payload,
            }
        );

        let err = bind(vec![ExecutionContext, HeaderBag, HeaderBag], vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRole { role: HeaderBag, .. }));
    }

    #[test]
    fn test_error_slot_must_be_last() {
        let err = bind(vec![], vec![OutputRole::Error, OutputRole::Value]).unwrap_err();
        assert_eq!(err, ConfigError::MisplacedErrorSlot);

        let err = bind(vec![], vec![OutputRole::Value, OutputRole::Value]).unwrap_err();
        assert_eq!(err, ConfigError::MisplacedErrorSlot);
    }

    #[test]
    fn test_return_shapes() {
        assert_eq!(bind(vec![], vec![]).unwrap().returns(), ReturnShape::Nothing);
        assert_eq!(
            bind(vec![], vec![OutputRole::Error]).unwrap().returns(),
            ReturnShape::Error
        );
        assert_eq!(
            bind(vec![], vec![OutputRole::Value, OutputRole::Error])
                .unwrap()
                .returns(),
            ReturnShape::ValueAndError
        );
    }

    #[test]
    fn test_payload_position() {
        assert_eq!(bind(vec![], vec![]).unwrap().payload_position(), None);
        assert_eq!(
            bind(vec![ExecutionContext, HeaderBag, Payload], vec![])
                .unwrap()
                .payload_position(),
            Some(2)
        );
        assert_eq!(
            bind(vec![ExecutionContext, HeaderBag], vec![])
                .unwrap()
                .payload_position(),
            None
        );
    }
}
