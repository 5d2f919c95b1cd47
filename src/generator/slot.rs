//! Per-slot fallback state machine:
//! `Pending -> DayAttempt -> {Validated | SingleAttempt -> {Validated | Placeholder}}`.

use super::meal::{Meal, MealSchemaError, MealType};

/// Why an LLM tier did not produce a usable meal for a slot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SlotFailure {
    #[error("llm request failed: {0}")]
    Request(String),
    #[error("llm response is not valid JSON: {0}")]
    Malformed(String),
    #[error("no {0} in the day response")]
    Missing(MealType),
    #[error("schema violation: {0}")]
    Schema(#[from] MealSchemaError),
}

/// Which tier produced the meal of a resolved slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    DayResponse,
    SingleMeal,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    Pending,
    DayAttempt,
    SingleAttempt { day_failure: SlotFailure },
    Validated { meal: Meal, resolution: Resolution },
    Placeholder { meal: Meal, last_failure: SlotFailure },
}

#[derive(Debug, Clone)]
pub struct MealSlot {
    pub meal_type: MealType,
    state: SlotState,
}

impl MealSlot {
    pub fn new(meal_type: MealType) -> Self {
        Self {
            meal_type,
            state: SlotState::Pending,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn begin_day_attempt(&mut self) {
        if matches!(self.state, SlotState::Pending) {
            self.state = SlotState::DayAttempt;
        }
    }

    pub fn on_day_result(&mut self, result: Result<Meal, SlotFailure>) {
        if !matches!(self.state, SlotState::DayAttempt) {
            return;
        }
        self.state = match result {
            Ok(meal) => SlotState::Validated {
                meal,
                resolution: Resolution::DayResponse,
            },
            Err(day_failure) => SlotState::SingleAttempt { day_failure },
        };
    }

    pub fn needs_single_attempt(&self) -> bool {
        matches!(self.state, SlotState::SingleAttempt { .. })
    }

    pub fn on_single_result(&mut self, result: Result<Meal, SlotFailure>) {
        if !self.needs_single_attempt() {
            return;
        }
        self.state = match result {
            Ok(meal) => SlotState::Validated {
                meal,
                resolution: Resolution::SingleMeal,
            },
            Err(last_failure) => SlotState::Placeholder {
                meal: Meal::placeholder(self.meal_type),
                last_failure,
            },
        };
    }

    /// Terminal meal of the slot. Any slot still in flight degrades to a
    /// placeholder so no slot is ever left unresolved.
    pub fn finish(self) -> (Meal, Resolution) {
        match self.state {
            SlotState::Validated { meal, resolution } => (meal, resolution),
            SlotState::Placeholder { meal, .. } => (meal, Resolution::Placeholder),
            _ => (Meal::placeholder(self.meal_type), Resolution::Placeholder),
        }
    }
}
