//! Meal plan intake and prompt construction
//!
//! Turns the intake form into the system/user prompt pair sent to the
//! completion service, and turns saved intakes back into display lines.
//! Nothing here touches the network.

use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Days covered by every generated plan
pub const PLAN_DAYS: usize = 3;

/// Declares a form enumeration with its wire slug
macro_rules! form_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $slug:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $slug)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $slug),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($slug => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }
    };
}

form_enum!(
    /// Age bracket in months
    AgeRange {
        SixToEight => "6-8",
        EightToTwelve => "8-12",
        TwelveToSixteen => "12-16",
        SixteenToTwenty => "16-20",
        TwentyToTwentyFour => "20-24",
    }
);

form_enum!(Sex {
    Boy => "boy",
    Girl => "girl",
});

form_enum!(Goal {
    HealthyWeightGain => "healthy-weight-gain",
    BalancedNutrition => "balanced-nutrition",
    AllergyPrevention => "allergy-prevention",
    PickyEater => "picky-eater",
    DigestiveHealth => "digestive-health",
});

form_enum!(Allergy {
    Dairy => "Dairy",
    Eggs => "Eggs",
    Nuts => "Nuts",
    Soy => "Soy",
    Wheat => "Wheat",
});

form_enum!(DietaryPreference {
    Vegetarian => "vegetarian",
    Vegan => "vegan",
    NoPreference => "no-preference",
});

/// Meals per day, always one of 2..=6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub struct MealsPerDay(u8);

impl MealsPerDay {
    pub const MIN: u8 = 2;
    pub const MAX: u8 = 6;

    pub fn new(count: u8) -> Result<Self, String> {
        if (Self::MIN..=Self::MAX).contains(&count) {
            Ok(Self(count))
        } else {
            Err(format!(
                "meals per day must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                count
            ))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for MealsPerDay {
    fn default() -> Self {
        Self(3)
    }
}

impl From<MealsPerDay> for u8 {
    fn from(m: MealsPerDay) -> u8 {
        m.0
    }
}

impl Display for MealsPerDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MealsPerDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let count: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("meals per day must be a number, got '{}'", s))?;
        Self::new(count)
    }
}

/// A form value that may arrive as a string or a bare number
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Number(f64),
}

impl Loose {
    fn into_text(self) -> String {
        match self {
            Loose::Text(s) => s,
            Loose::Number(n) => n.to_string(),
        }
    }
}

/// Blank strings and nulls become `None`; anything else must parse
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => {
            let text = raw.into_text();
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                text.parse().map(Some).map_err(de::Error::custom)
            }
        }
    }
}

impl<'de> Deserialize<'de> for MealsPerDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(lenient(deserializer)?.unwrap_or_default())
    }
}

/// The intake form as the user fills it in
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlanIntake {
    #[serde(default, deserialize_with = "lenient")]
    pub age_range: Option<AgeRange>,
    #[serde(default, deserialize_with = "lenient")]
    pub height_cm: Option<f32>,
    #[serde(default, deserialize_with = "lenient")]
    pub weight_kg: Option<f32>,
    #[serde(default, deserialize_with = "lenient")]
    pub sex: Option<Sex>,
    #[serde(default, deserialize_with = "lenient")]
    pub goal: Option<Goal>,
    #[serde(default)]
    pub meals_per_day: MealsPerDay,
    #[serde(default)]
    pub allergies: BTreeSet<Allergy>,
    #[serde(default, deserialize_with = "lenient")]
    pub dietary_preference: Option<DietaryPreference>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} must be positive")]
    NotPositive(&'static str),

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: f32,
        max: f32,
    },
}

/// Bounds of the weight input, in kg
const WEIGHT_RANGE: (f32, f32) = (3.0, 20.0);

fn check_positive(field: &'static str, value: f32) -> Result<f32, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive(field))
    }
}

fn check_range(
    field: &'static str,
    value: f32,
    (min, max): (f32, f32),
) -> Result<f32, ValidationError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange { field, min, max })
    }
}

impl PlanIntake {
    /// Check the mandatory fields and produce an intake ready for prompting
    pub fn validate(&self) -> Result<ValidIntake, ValidationError> {
        let age_range = self.age_range.ok_or(ValidationError::Missing("age_range"))?;
        let height_cm = self.height_cm.ok_or(ValidationError::Missing("height_cm"))?;
        let weight_kg = self.weight_kg.ok_or(ValidationError::Missing("weight_kg"))?;
        let sex = self.sex.ok_or(ValidationError::Missing("sex"))?;

        Ok(ValidIntake {
            age_range,
            height_cm: check_positive("height_cm", height_cm)?,
            weight_kg: check_range("weight_kg", weight_kg, WEIGHT_RANGE)?,
            sex,
            goal: self.goal,
            meals_per_day: self.meals_per_day,
            allergies: self.allergies.clone(),
            dietary_preference: self.dietary_preference,
        })
    }
}

/// An intake with every mandatory field present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidIntake {
    pub age_range: AgeRange,
    pub height_cm: f32,
    pub weight_kg: f32,
    pub sex: Sex,
    #[serde(default)]
    pub goal: Option<Goal>,
    #[serde(default)]
    pub meals_per_day: MealsPerDay,
    #[serde(default)]
    pub allergies: BTreeSet<Allergy>,
    #[serde(default)]
    pub dietary_preference: Option<DietaryPreference>,
}

impl ValidIntake {
    fn allergies_text(&self) -> String {
        if self.allergies.is_empty() {
            "None".to_string()
        } else {
            self.allergies
                .iter()
                .map(Allergy::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    /// Short description, e.g. "6-8 months old boy"
    pub fn headline(&self) -> String {
        format!("{} months old {}", self.age_range, self.sex)
    }
}

/// The two prompt texts for one generation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanPrompt {
    pub system: String,
    pub user: String,
}

/// Build the deterministic prompt pair for a validated intake
pub fn build_prompt(intake: &ValidIntake) -> PlanPrompt {
    let meals = intake.meals_per_day;

    let system = format!(
        "You are an expert baby nutritionist creating {days}-day meal plans. \
         Always structure your response with separate sections for Day 1, Day 2, and Day 3, \
         followed by preparation instructions and safety guidelines. \
         Never combine days or skip days. Each day must have {meals} meals with specific times.",
        days = PLAN_DAYS,
        meals = meals,
    );

    let goal_line = intake
        .goal
        .map(|goal| format!("Goals: {}\n", goal))
        .unwrap_or_default();
    let days: String = (1..=PLAN_DAYS)
        .map(|day| {
            format!(
                "\nDAY {}:\n[List each of the {} meals with exact times, portions, and ingredients]\n",
                day, meals
            )
        })
        .collect();
    let tracking = if intake.goal.is_some() {
        "\nPROGRESS TRACKING:\n[Include specific tracking tips]\n"
    } else {
        ""
    };

    let user = format!(
        "Generate a comprehensive {days_count}-day baby food plan. \
         Structure the response exactly as follows:\n\n\
         BABY DETAILS:\n\
         Age: {age} months\n\
         Height: {height} cm\n\
         Weight: {weight} kg\n\
         Sex: {sex}\n\
         {goal_line}\
         Meals per day: {meals}\n\
         Allergies: {allergies}\n\
         Diet: {diet}\n\
         {days}\
         \nPREPARATION INSTRUCTIONS:\n[Include specific instructions for food preparation]\n\
         \nSAFETY GUIDELINES:\n[List key safety points]\n\
         \nNUTRITIONAL INFORMATION:\n[Provide nutritional highlights]\n\
         {tracking}\
         \nUse bullet points and clear headings. \
         Ensure meals are age-appropriate and portions are consistent.",
        days_count = PLAN_DAYS,
        age = intake.age_range,
        height = intake.height_cm,
        weight = intake.weight_kg,
        sex = intake.sex,
        goal_line = goal_line,
        meals = meals,
        allergies = intake.allergies_text(),
        diet = intake
            .dietary_preference
            .map(|d| d.as_str())
            .unwrap_or("Standard"),
        days = days,
        tracking = tracking,
    );

    PlanPrompt { system, user }
}

/// What gets persisted for a saved plan: the intake plus the generated text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDetails {
    #[serde(flatten)]
    pub intake: ValidIntake,
    pub plan: String,
}

/// Display lines for a saved plan's intake
pub fn summarize(details: &PlanDetails) -> Vec<String> {
    let intake = &details.intake;
    let mut lines = vec![
        format!("Age: {} months", intake.age_range),
        format!("Height: {} cm", intake.height_cm),
        format!("Weight: {} kg", intake.weight_kg),
        format!("Sex: {}", intake.sex),
    ];
    if let Some(goal) = intake.goal {
        lines.push(format!("Goals: {}", goal));
    }
    lines.push(format!("Meals per day: {}", intake.meals_per_day));
    lines.push(format!("Allergies: {}", intake.allergies_text()));
    lines.push(format!(
        "Dietary Preference: {}",
        intake
            .dietary_preference
            .map(|d| d.as_str())
            .unwrap_or("No specific preference")
    ));
    lines
}
