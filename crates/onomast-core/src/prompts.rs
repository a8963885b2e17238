//! Chat requests for the three enrichment calls.
//!
//! Classification and assessment ask for a single JSON object; the
//! narrative is plain text. Prompts are in Spanish because the labels the
//! model must echo back are Spanish.

use onomast_llm::{ChatMessage, ChatRequest};

use crate::taxonomy::Origin;

const SYSTEM: &str = "Eres un experto en onomástica y etimología de nombres de pila. \
Respondes con precisión, sin inventar datos y sin formato markdown.";

const CLASSIFY_TEMPERATURE: f64 = 0.0;
const NARRATE_TEMPERATURE: f64 = 0.7;
const ASSESS_TEMPERATURE: f64 = 0.2;

pub fn classify_request(model: &str, name: &str) -> ChatRequest {
    let prompt = format!(
        "Clasifica el nombre \"{name}\" según su origen etimológico.\n\
\n\
Reglas para nombres compuestos:\n\
- Si mezcla un nombre anglosajón con uno español, la categoría es \"Latinoamericano\".\n\
- En otro caso, manda el componente más alejado del español (\"María Aitor\" es \"Vasco\").\n\
\n\
\"Español\" incluye los nombres latinos, bíblicos y germánicos ya castellanizados \
(María, José, Guillermo). Usa otra categoría solo si el nombre conserva su forma extranjera.\n\
Si no estás seguro usa \"Desconocido\"; si no encaja en ninguna usa \"Otro\".\n\
\n\
Categorías permitidas: {labels}.\n\
\n\
Responde solo con un objeto JSON de la forma {{\"origin\": \"<categoría>\"}}.",
        labels = Origin::label_list(),
    );
    ChatRequest::new(model, vec![ChatMessage::system(SYSTEM), ChatMessage::user(prompt)])
        .with_json_output()
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(50)
}

pub fn narrate_request(model: &str, name: &str, category: Origin) -> ChatRequest {
    let prompt = format!(
        "Escribe una descripción breve y amena del nombre \"{name}\", de origen {category}.\n\
\n\
Cuando se conozca, incluye su significado, su contexto histórico o cultural, personas \
célebres que lo lleven y sus variantes en otros idiomas. Si es compuesto, habla de ambas \
partes. Omite lo que no sepas con seguridad.\n\
\n\
Máximo 150 palabras, en español, en texto plano, sin negritas ni cursivas, y con los \
nombres propios en mayúscula inicial."
    );
    ChatRequest::new(model, vec![ChatMessage::system(SYSTEM), ChatMessage::user(prompt)])
        .with_temperature(NARRATE_TEMPERATURE)
        .with_max_tokens(400)
}

pub fn assess_request(model: &str, name: &str, category: Origin) -> ChatRequest {
    let prompt = format!(
        "Valora lo difícil que es pronunciar el nombre \"{name}\" (origen: {category}) \
para hablantes de español y para extranjeros, sobre todo angloparlantes.\n\
\n\
Escala: \"muy fácil\", \"fácil\", \"difícil\", \"muy difícil\".\n\
- Para hispanohablantes, los fonemas ajenos al español (Txomin, Nguyen, Siobhan) son lo más difícil.\n\
- Para extranjeros, lo son la rr, la ñ, la j española y las estructuras largas (Guillermo).\n\
\n\
En la explicación (máximo 100 palabras) señala los sonidos problemáticos, las letras mudas \
y la diferencia entre ambos grupos.\n\
\n\
Responde solo con un objeto JSON con las claves \"spanish\", \"foreign\" y \"explanation\"."
    );
    ChatRequest::new(model, vec![ChatMessage::system(SYSTEM), ChatMessage::user(prompt)])
        .with_json_output()
        .with_temperature(ASSESS_TEMPERATURE)
        .with_max_tokens(300)
}
