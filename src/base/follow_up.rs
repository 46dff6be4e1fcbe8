//! Built-in clarifying questions per disease label.
//!
//! Labels match the classifier's output exactly, including the spelling quirks of
//! the training set (e.g. `Osteoarthristis`, `Peptic ulcer diseae`).

use std::collections::HashMap;

/// Disease label to ordered follow-up questions.
pub const FOLLOW_UP_QUESTIONS: &[(&str, &[&str])] = &[
    (
        "(vertigo) Paroymsal  Positional Vertigo",
        &["Do you feel dizzy when changing head position?", "Do you experience spinning sensations?"],
    ),
    ("AIDS", &["Have you had unexplained weight loss or prolonged fever?", "Have you experienced frequent infections?"]),
    ("Acne", &["Do you have pimples or cysts on your face or body?", "Is your skin oily or inflamed?"]),
    ("Alcoholic hepatitis", &["Do you consume alcohol frequently?", "Have you noticed jaundice or abdominal pain?"]),
    ("Allergy", &["Do you experience sneezing or itching?", "Are symptoms triggered by dust, food, or pollen?"]),
    ("Arthritis", &["Do you have joint pain or stiffness?", "Is the pain worse in the morning?"]),
    ("Bronchial Asthma", &["Do you experience wheezing or shortness of breath?", "Are symptoms triggered by exercise or allergens?"]),
    ("Cervical spondylosis", &["Do you have neck pain or stiffness?", "Does the pain radiate to your arms?"]),
    ("Chicken pox", &["Do you have itchy rashes or blisters?", "Have you recently been in contact with someone infected?"]),
    ("Chronic cholestasis", &["Have you noticed yellowing of skin or eyes?", "Do you have persistent itching?"]),
    ("Common Cold", &["Do you have a runny or blocked nose?", "Are you experiencing sneezing or sore throat?"]),
    ("Dengue", &["Do you have high fever with body pain?", "Have you noticed bleeding or rashes?"]),
    ("Diabetes", &["Do you feel excessively thirsty or hungry?", "Are you urinating more frequently?"]),
    ("Dimorphic hemmorhoids(piles)", &["Do you experience pain during bowel movements?", "Have you noticed blood in your stool?"]),
    ("Drug Reaction", &["Did symptoms start after taking a new medication?", "Do you have rashes or swelling?"]),
    ("Fungal infection", &["Do you have itchy or red patches on skin?", "Is the affected area moist or scaly?"]),
    ("GERD", &["Do you experience heartburn or acid reflux?", "Is discomfort worse after eating?"]),
    ("Gastroenteritis", &["Do you have diarrhea or vomiting?", "Have you eaten outside food recently?"]),
    ("Heart attack", &["Do you have chest pain or pressure?", "Does pain spread to your arm or jaw?"]),
    ("Hepatitis B", &["Have you noticed fatigue or jaundice?", "Do you have abdominal discomfort?"]),
    ("Hepatitis C", &["Have you experienced chronic fatigue?", "Have you had previous blood transfusions?"]),
    ("Hepatitis D", &["Do you have symptoms similar to hepatitis B?", "Have you been previously diagnosed with hepatitis B?"]),
    ("Hepatitis E", &["Do you have nausea or yellowing of eyes?", "Have you consumed contaminated water?"]),
    ("Hypertension", &["Do you experience headaches or dizziness?", "Have you checked your blood pressure recently?"]),
    ("Hyperthyroidism", &["Have you noticed unexplained weight loss?", "Do you feel anxious or restless?"]),
    ("Hypoglycemia", &["Do you feel shaky or sweaty?", "Have you skipped meals recently?"]),
    ("Hypothyroidism", &["Do you feel tired or gain weight easily?", "Is your skin dry or cold sensitive?"]),
    ("Impetigo", &["Do you have honey-colored crusted sores?", "Are the sores spreading quickly?"]),
    ("Jaundice", &["Have your eyes or skin turned yellow?", "Is your urine dark in color?"]),
    ("Malaria", &["Do you experience fever with chills?", "Have you traveled to a mosquito-prone area?"]),
    ("Migraine", &["Do you experience severe headaches with nausea?", "Are you sensitive to light or sound?"]),
    ("Osteoarthristis", &["Do you have joint pain that worsens with movement?", "Is there reduced joint flexibility?"]),
    ("Paralysis (brain hemorrhage)", &["Do you have sudden weakness on one side of the body?", "Are you experiencing speech difficulty?"]),
    ("Peptic ulcer diseae", &["Do you have burning stomach pain?", "Is the pain worse on an empty stomach?"]),
    ("Pneumonia", &["Do you have cough with fever?", "Are you experiencing difficulty breathing?"]),
    ("Psoriasis", &["Do you have red scaly patches on skin?", "Is there itching or burning sensation?"]),
    ("Tuberculosis", &["Do you have prolonged cough?", "Have you noticed weight loss or night sweats?"]),
    ("Typhoid", &["Do you have prolonged fever?", "Are you experiencing abdominal pain?"]),
    ("Urinary tract infection", &["Do you feel burning during urination?", "Are you urinating frequently?"]),
    ("Varicose veins", &["Do you have swollen or twisted veins?", "Do your legs ache after standing long?"]),
    ("hepatitis A", &["Do you have nausea or fatigue?", "Have you consumed contaminated food or water?"]),
];

/// Immutable disease label to follow-up question lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowUpTable {
    questions: HashMap<String, Vec<String>>,
}

impl FollowUpTable {
    pub fn new<I, L, Q>(entries: I) -> Self
    where
        I: IntoIterator<Item = (L, Vec<Q>)>,
        L: Into<String>,
        Q: Into<String>,
    {
        let questions = entries.into_iter().map(|(label, qs)| (label.into(), qs.into_iter().map(Into::into).collect())).collect();

        Self { questions }
    }

    /// The compiled-in table.
    pub fn builtin() -> Self {
        Self::new(FOLLOW_UP_QUESTIONS.iter().map(|(label, qs)| (*label, qs.to_vec())))
    }

    /// Questions for `label`, or an empty slice when the label is unknown.
    pub fn questions(&self, label: &str) -> &[String] {
        self.questions.get(label).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.questions.keys().map(String::as_str)
    }
}
