//! Prompt text for the two completion calls.

use brochure_common::text::truncate_owned;

/// Hard cap on the brochure user prompt, in characters, applied after assembly.
pub const PROMPT_LIMIT: usize = 5_000;

pub const LINK_SYSTEM_PROMPT: &str = r#"
You are provided with a list of links found on a webpage.
You are able to decide which of the links would be most relevant to include in a brochure about the company,
such as links to an About page, or a Company page, or Careers/Jobs pages.
You should respond in JSON as in this example:

{
    "links": [
        {"type": "about page", "url": "https://full.url/goes/here/about"},
        {"type": "careers page", "url": "https://another.full.url/careers"}
    ]
}
"#;

pub const BROCHURE_SYSTEM_PROMPT: &str = "
You are an assistant that analyzes the contents of several relevant pages from a company website
and creates a short brochure about the company for prospective customers, investors and recruits.
Respond in markdown without code blocks.
Include details of company culture, customers and careers/jobs if you have the information.
Make it engaging and professional.
";

/// The link-selection request: the page URL plus every raw link, one per line.
pub fn link_user_prompt(url: &str, links: &[String]) -> String {
    let mut prompt = format!(
        "\nHere is the list of links on the website {url} -\n\
         Please decide which of these are relevant web links for a brochure about the company, \n\
         respond with the full https URL in JSON format.\n\
         Do not include Terms of Service, Privacy, email links.\n\
         \n\
         Links (some might be relative links):\n\n"
    );
    prompt.push_str(&links.join("\n"));
    prompt
}

/// Company preamble followed by the aggregated document, cut to [`PROMPT_LIMIT`].
pub fn brochure_user_prompt(company_name: &str, document: &str) -> String {
    let prompt = format!(
        "\nYou are looking at a company called: {company_name}\n\
         Here are the contents of its landing page and other relevant pages;\n\
         use this information to build a short brochure of the company in markdown without code blocks.\n\n\n\
         {document}"
    );
    truncate_owned(prompt, PROMPT_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_prompt_lists_links_verbatim() {
        let links = vec!["/about".to_string(), "mailto:x@y.z".to_string()];
        let prompt = link_user_prompt("https://acme.test", &links);
        assert!(prompt.starts_with("\nHere is the list of links on the website https://acme.test -\n"));
        assert!(prompt.contains("the company, \nrespond with the full https URL"));
        assert!(prompt.ends_with("Links (some might be relative links):\n\n/about\nmailto:x@y.z"));
    }

    #[test]
    fn brochure_prompt_names_company_then_document() {
        let prompt = brochure_user_prompt("Acme", "## Landing Page:\n\nhi");
        assert!(prompt.starts_with("\nYou are looking at a company called: Acme\n"));
        assert!(prompt.contains("without code blocks.\n\n\n## Landing Page:"));
    }

    #[test]
    fn brochure_prompt_is_capped_after_assembly() {
        let document = "ü".repeat(PROMPT_LIMIT * 2);
        let prompt = brochure_user_prompt("Acme", &document);
        assert_eq!(prompt.chars().count(), PROMPT_LIMIT);
        assert!(prompt.contains("Acme"));
    }

    #[test]
    fn system_prompts_carry_their_instructions() {
        assert!(LINK_SYSTEM_PROMPT.contains(r#""links": ["#));
        assert!(BROCHURE_SYSTEM_PROMPT.contains("Respond in markdown without code blocks."));
    }
}
