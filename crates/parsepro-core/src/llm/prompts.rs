/// The fixed instruction block sent ahead of every resume's extracted text.
///
/// The field names here and the keys `ingest::normalizer` reads are one
/// versioned contract; change them together or not at all.
pub const EXTRACTION_PROMPT: &str = r#"You are a resume parsing service. Read the resume text that follows and reply with a single JSON object of exactly this shape:

{
  "name": string,
  "education": string,
  "certification": [string],
  "skills": [string],
  "email": string,
  "contact_no": string,
  "cgpa": number or null,
  "project1": {"name": string, "description": string},
  "project2": {"name": string, "description": string},
  "project3": {"name": string, "description": string},
  "project4": {"name": string, "description": string}
}

Rules:
- "name" is the candidate's full name; "education" is their most recent degree and institution.
- "certification" and "skills" are flat lists of strings.
- "contact_no" is the candidate's phone number as written.
- "cgpa" is a number, or null when the resume states none.
- Include only the projects the resume actually describes, starting at "project1"; omit the rest.
- Use "" for any text field the resume does not state.
- Reply with the JSON object only. No prose, no markdown fences, no extra keys.

Resume text:
"#;
