use std::fmt::Write as _;

use super::meal::{Meal, MealType, NutritionalInfo};

const DIGEST_DESCRIPTION_CHARS: usize = 80;

#[derive(Debug, Clone)]
struct MealDigest {
    day: u32,
    meal_type: MealType,
    recipe_name: String,
    description: String,
    nutrition: NutritionalInfo,
}

/// Running summary of the days generated so far, fed into later prompts
/// to steer away from repeats and to balance nutrition across the plan.
#[derive(Debug, Clone, Default)]
pub struct DiversityContext {
    digests: Vec<MealDigest>,
    days: u32,
    calories: u64,
    protein: f64,
    carbs: f64,
    fat: f64,
}

impl DiversityContext {
    pub fn record_day(&mut self, day: u32, meals: &[Meal]) {
        for meal in meals {
            let n = &meal.nutritional_info;
            self.calories += u64::from(n.calories);
            self.protein += n.protein;
            self.carbs += n.carbs;
            self.fat += n.fat;
            self.digests.push(MealDigest {
                day,
                meal_type: meal.meal_type,
                recipe_name: meal.recipe_name.clone(),
                description: meal.description.chars().take(DIGEST_DESCRIPTION_CHARS).collect(),
                nutrition: n.clone(),
            });
        }
        self.days += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Digest used by the full-day prompt.
    pub fn previous_meals(&self) -> String {
        if self.is_empty() {
            return "None (Day 1)".to_string();
        }
        let mut out = String::new();
        for d in &self.digests {
            let _ = writeln!(
                out,
                "- Day {} {}: {}: {} ({} kcal, protein {:.1}g, carbs {:.1}g, fat {:.1}g)",
                d.day,
                d.meal_type,
                d.recipe_name,
                d.description,
                d.nutrition.calories,
                d.nutrition.protein,
                d.nutrition.carbs,
                d.nutrition.fat
            );
        }
        out.trim_end().to_string()
    }

    /// Names only, for the narrower single-meal prompt.
    pub fn previous_recipe_names(&self) -> String {
        if self.is_empty() {
            return "None".to_string();
        }
        self.digests
            .iter()
            .map(|d| format!("- {}: {}", d.meal_type, d.recipe_name))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn nutrition_summary(&self) -> String {
        if self.days == 0 {
            return "None (Day 1)".to_string();
        }
        let days = f64::from(self.days);
        format!(
            "Previous {n} day(s) totals:\n\
             - Calories: {cal} ({cal_avg} avg/day)\n\
             - Protein: {p:.1}g ({p_avg:.1}g avg/day)\n\
             - Carbs: {c:.1}g ({c_avg:.1}g avg/day)\n\
             - Fat: {f:.1}g ({f_avg:.1}g avg/day)",
            n = self.days,
            cal = self.calories,
            cal_avg = self.calories / u64::from(self.days),
            p = self.protein,
            p_avg = self.protein / days,
            c = self.carbs,
            c_avg = self.carbs / days,
            f = self.fat,
            f_avg = self.fat / days,
        )
    }
}
