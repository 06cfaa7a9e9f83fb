//! Built-in feeding articles
//!
//! A small read-only library shown next to the chat. Paragraphs are
//! separated by blank lines.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Article {
    pub slug: &'static str,
    pub title: &'static str,
    #[serde(skip)]
    pub content: &'static str,
}

impl Article {
    /// Body split on blank lines
    pub fn paragraphs(&self) -> Vec<&'static str> {
        self.content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

pub const ARTICLES: &[Article] = &[
    Article {
        slug: "getting-started-with-solid-foods",
        title: "Getting Started with Solid Foods",
        content: SOLID_FOODS,
    },
    Article {
        slug: "best-first-foods-for-your-baby",
        title: "Best First Foods for Your Baby",
        content: FIRST_FOODS,
    },
    Article {
        slug: "common-food-allergies-in-babies",
        title: "Common Food Allergies in Babies",
        content: ALLERGIES,
    },
    Article {
        slug: "baby-led-weaning-vs-traditional-weaning",
        title: "Baby-Led Weaning vs Traditional Weaning",
        content: WEANING,
    },
    Article {
        slug: "creating-a-balanced-baby-diet",
        title: "Creating a Balanced Baby Diet",
        content: BALANCED_DIET,
    },
];

/// Look up an article by slug
pub fn find(slug: &str) -> Option<&'static Article> {
    ARTICLES.iter().find(|a| a.slug == slug)
}

const SOLID_FOODS: &str = r#"When to Start Solid Foods

Your baby's journey into solid foods is an exciting milestone that typically begins around 6 months of age. Here's your comprehensive guide to starting solids.

Signs of Readiness:
• Can sit upright with minimal support
• Shows good head and neck control
• Lost the tongue-thrust reflex
• Shows interest in food
• Has doubled their birth weight
• Can move food to the back of their mouth

First Steps:
1. Start with single-ingredient foods
2. Wait 3-5 days between new foods
3. Begin with iron-rich foods
4. Offer food after milk feeding
5. Keep portions small (1-2 teaspoons)

Best First Foods:
• Iron-fortified infant cereal
• Pureed meat
• Mashed avocado
• Pureed sweet potato
• Mashed banana
• Pureed peas

Safety Guidelines:
• Always supervise feeding
• Ensure proper consistency
• Watch for allergic reactions
• Never force feed
• Stop at first signs of fullness

Remember: Every baby is different, and it's okay to go at your own pace. Consult your pediatrician before starting solids."#;

const FIRST_FOODS: &str = r#"Essential First Foods for Your Baby's Journey

Starting solids is a crucial step in your baby's development. Here's a guide to the best first foods and how to prepare them.

Iron-Rich Foods (Start Here):
• Iron-fortified infant cereal
• Pureed meat (beef, chicken, turkey)
• Pureed legumes
• Egg yolk (if approved by pediatrician)

Vegetables:
• Sweet potato
• Carrots
• Green peas
• Squash
• Green beans

Fruits:
• Banana
• Avocado
• Apple
• Pear
• Peach

Preparation Methods:
1. Steaming - Preserves nutrients
2. Boiling - Use minimal water
3. Baking - Enhances natural flavors
4. Pureeing - Ensure smooth consistency

Portion Sizes:
• Start with 1-2 teaspoons
• Gradually increase to 2-4 tablespoons
• Follow baby's hunger cues

Storage Tips:
• Refrigerate for 48 hours
• Freeze in ice cube trays
• Label with date and contents
• Thaw in refrigerator overnight

Remember: Always introduce one food at a time and watch for any reactions."#;

const ALLERGIES: &str = r#"Understanding and Managing Food Allergies in Babies

Food allergies affect up to 8% of babies and young children. Here's what you need to know about introducing allergenic foods safely.

Common Allergens:
1. Cow's milk
2. Eggs
3. Peanuts
4. Tree nuts
5. Fish
6. Shellfish
7. Soy
8. Wheat

Signs of Allergic Reaction:
• Skin rash or hives
• Swelling of face, lips, tongue
• Vomiting or diarrhea
• Difficulty breathing
• Coughing or wheezing
• Lethargy or paleness

Safe Introduction:
1. Start early (4-6 months, with doctor's approval)
2. One new food at a time
3. Small amounts first
4. Morning introductions
5. Wait 3-5 days between new foods
6. Keep a food diary

Emergency Preparedness:
• Know the signs of anaphylaxis
• Have emergency numbers ready
• Discuss action plan with doctor
• Consider medical ID bracelet

Prevention Tips:
• Follow doctor's recommendations
• Don't delay introduction
• Maintain consistent exposure
• Keep detailed records"#;

const WEANING: &str = r#"Comparing Baby-Led Weaning and Traditional Spoon-Feeding

Understanding different weaning approaches helps you choose the best method for your baby.

Baby-Led Weaning (BLW):
Advantages:
• Develops motor skills
• Promotes self-feeding
• Encourages food exploration
• May reduce picky eating
• Joins family meals earlier

Considerations:
• Messier mealtimes
• Initial food waste
• Requires close supervision
• May take longer to eat
• Need to modify food size/shape

Traditional Spoon-Feeding:
Advantages:
• Better portion control
• Less mess
• Easier to track intake
• Familiar to caregivers
• Potentially faster mealtimes

Considerations:
• Less sensory exploration
• May need to transition to self-feeding
• Could develop food texture issues
• Less independence at mealtimes

Safety Tips for Both Methods:
• Always supervise meals
• Proper sitting position
• Know choking hazards
• First aid knowledge
• Regular feeding schedule

Choose based on:
• Baby's development
• Family lifestyle
• Comfort level
• Pediatrician advice"#;

const BALANCED_DIET: &str = r#"Building a Nutritious Diet for Your 6-12 Month Old

A balanced diet is crucial for your baby's growth and development. Here's how to ensure optimal nutrition.

Essential Nutrients:
1. Iron
   • Fortified cereals
   • Pureed meats
   • Legumes

2. Protein
   • Meat
   • Fish
   • Eggs
   • Legumes

3. Healthy Fats
   • Avocado
   • Olive oil
   • Fish
   • Breast milk/formula

4. Carbohydrates
   • Cereals
   • Sweet potato
   • Fruits
   • Vegetables

Daily Meal Planning:
• 2-3 solid meals
• 4-6 milk feeds
• Snacks as needed
• Water with meals

Portion Guidelines:
Breakfast: 2-4 tablespoons
Lunch: 2-4 tablespoons
Dinner: 2-4 tablespoons
Snacks: 1-2 tablespoons

Tips for Success:
• Offer variety
• Include all food groups
• Follow baby's cues
• Be consistent
• Make it colorful"#;
