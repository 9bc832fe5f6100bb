//! The reducer abstraction.
//!
//! A reducer is a pure function `(State, Action, Environment) → (State, Effects)`.
//! It owns the business rules of a workflow and never performs I/O itself:
//! the effects it returns are plain values describing what the imperative
//! shell should do next. The shell executes them and feeds the outcome back
//! in as a new action.

use smallvec::SmallVec;

/// Effects returned by a single reduction.
///
/// Most transitions emit zero or one effect, so four inline slots avoid a heap
/// allocation on every step.
pub type Effects<E> = SmallVec<[E; 4]>;

/// The Reducer trait - core abstraction for business logic
///
/// # Example
///
/// ```ignore
/// impl Reducer for CheckoutSaga {
///     type State = CheckoutState;
///     type Action = CheckoutAction;
///     type Effect = CheckoutCommand;
///     type Environment = ();
///
///     fn reduce(
///         &self,
///         state: &mut CheckoutState,
///         action: CheckoutAction,
///         env: &(),
///     ) -> Effects<CheckoutCommand> {
///         match action {
///             CheckoutAction::Start { order } => smallvec![CheckoutCommand::ReserveBooking { order }],
///             _ => SmallVec::new(),
///         }
///     }
/// }
/// ```
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// Effect descriptions this reducer emits
    type Effect;

    /// The environment type with injected dependencies
    type Environment;

    /// Reduce an action into state changes and effects
    ///
    /// Updates `state` in place and returns the effects to be executed by the
    /// caller, in order.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Effect>;
}
