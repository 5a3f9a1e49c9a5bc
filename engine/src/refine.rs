//! Turns a short user prompt into a detailed Imagen prompt with the help of an LLM.

use color_eyre::Result;
use log::{info, warn};

use crate::llm::{self, InputMessage, LLM, Request, Sampling};

pub const START_MARKER: &str = "[Start of Imagen 3 Prompt]";
pub const END_MARKER: &str = "[End of Imagen 3 Prompt]";
pub const DEFAULT_MAX_TOKENS: usize = 480;

pub const SAMPLING: Sampling = Sampling {
    temperature: Some(1.0),
    top_p: Some(0.95),
    top_k: Some(40),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedPrompt {
    /// The text between the markers, trimmed
    Marked(String),
    /// The markers were missing, this is the whole response
    Unmarked(String),
}

/// Pulls the prompt out of the marker pair. The end marker has to follow the
/// start marker, otherwise the response is taken as is.
pub fn extract_prompt(response: &str) -> ExtractedPrompt {
    let Some(start) = response.find(START_MARKER) else {
        return ExtractedPrompt::Unmarked(response.to_string());
    };
    let body_start = start + START_MARKER.len();
    match response[body_start..].find(END_MARKER) {
        Some(len) => {
            ExtractedPrompt::Marked(response[body_start..body_start + len].trim().to_string())
        }
        None => ExtractedPrompt::Unmarked(response.to_string()),
    }
}

pub fn construct_request(user_prompt: &str, guide: &str, max_tokens: usize) -> Request {
    let instructions = indoc::formatdoc! {r#"
        You are an expert prompt engineer specializing in creating detailed and effective prompts for Imagen 3, Google's advanced text-to-image model. Your goal is to take a user's initial, possibly simple, prompt and enhance it to produce high-quality images using Imagen 3.

        Follow these steps to create the improved prompt:

        1. **Understand the User's Request:** Analyze the user's initial prompt to grasp the core subject, desired context, and any implied style or mood.

        2. **Consult the Imagen Prompt Guide:** Carefully review the provided 'Imagen prompt guide' documentation to understand the best practices for prompting Imagen 3. Pay close attention to sections on:
            - Prompt writing basics (subject, context, and style)
            - Imagen 3 prompt writing advice (descriptive language, context, artist/style references, prompt engineering tools)
            - Enhancing facial details
            - Generating text in images
            - Prompt parameterization
            - Style examples (photography, illustration, art)
            - Advanced prompt writing techniques (photography modifiers, shapes and materials, historical art references, image quality modifiers)
            - Aspect ratios
            - Photorealistic images (guidance for different subjects like portraits, objects, motion, wide-angle)

        3. **Refine the Prompt based on the Guide:**  Using the insights from the 'Imagen prompt guide', enhance the user's prompt by adding specific details and modifiers. Consider improving these aspects:
            - **Subject:** Ensure the subject is clearly defined and detailed.
            - **Context and Background:** Elaborate on the scene's background, environment, and setting.
            - **Style:** Specify a visual style (e.g., photography, painting, digital art, sketch). Be as specific as possible (e.g., watercolor painting, hyperrealistic digital art, black and white photography).
            - **Photography Modifiers (if applicable):** Add relevant photography descriptors like camera proximity, position, lighting (natural, dramatic, warm, cold), camera settings (motion blur, bokeh), lens types (35mm, macro, fisheye), film types (black and white, polaroid).
            - **Shapes and Materials (if applicable):** If the prompt involves objects or specific forms, consider specifying materials and shapes.
            - **Historical Art References (if applicable):** If a particular art style is desired, reference historical art periods or movements (e.g., Impressionism, Renaissance, Pop Art, Art Deco).
            - **Image Quality Modifiers:** Include quality-enhancing keywords like 'high-quality', 'beautiful', 'stylized', '4K', 'HDR', 'Studio Photo', 'detailed', 'by a professional'.
            - **Aspect Ratio:** Suggest an appropriate aspect ratio if it's not already implied in the user prompt (consider 1:1, 4:3, 3:4, 16:9, 9:16 based on the subject).
            - **Photorealistic Guidance (if photorealism is desired):** Use lens type, focal length, and detail suggestions from the guide to enhance photorealism based on the subject (portraits, objects, motion, landscape).

        4. **Ensure Prompt is Imagen 3 Compatible:** Verify that the refined prompt adheres to Imagen 3's capabilities and limitations, such as the maximum prompt length (480 tokens - though you don't need to count tokens manually, just keep the prompt reasonably concise and detailed).

        5. **Output Only the Imagen 3 Prompt:** Your final output should be ONLY the refined Imagen 3 prompt text, ready to be used directly with the Imagen 3 model.  Do not include any extra conversational text, explanations, or apologies. Just the prompt.

        **User's Initial Prompt:**
        {user_prompt}

        **Imagen Prompt Guide Documentation:**
        {guide}

        **Response format:**
        {START_MARKER}
        <refined and detailed Imagen 3 prompt text>
        {END_MARKER}

        **Example of expected output format:**

        {START_MARKER}
        A hyperrealistic, 4K HDR studio photograph of a tabby cat wearing sunglasses, lounging lazily on a sun-drenched windowsill. The scene is brightly lit with natural lighting, highlighting the cat's fur details. Use a 35mm lens for a portrait effect.
        {END_MARKER}

        Now, generate a detailed and improved Imagen 3 prompt based on the user's initial prompt and the provided Imagen Prompt Guide. Remember to ONLY output the prompt text, enclosed within '{START_MARKER}' and '{END_MARKER}' markers.
    "#};

    Request {
        system: None,
        messages: vec![InputMessage::user(instructions)],
        max_tokens,
        sampling: SAMPLING,
    }
}

/// Asks the LLM for a refined prompt. Falls back to the whole response, with a
/// warning, if the model ignored the marker format.
pub async fn refine_prompt(
    llm: &mut (dyn LLM + Send),
    user_prompt: &str,
    guide: &str,
    max_tokens: usize,
) -> Result<String> {
    let req = construct_request(user_prompt, guide, max_tokens);
    let message = llm::send_request(llm, req).await?;
    info!(
        "Refinement used {} input and {} output tokens",
        message.input_tokens, message.output_tokens
    );

    Ok(match extract_prompt(&message.text) {
        ExtractedPrompt::Marked(prompt) => prompt,
        ExtractedPrompt::Unmarked(text) => {
            warn!("Prompt markers not found in the response. Using the full response as prompt.");
            text
        }
    })
}

#[cfg(test)]
mod tests {
    use color_eyre::eyre::eyre;

    use crate::llm::{LLMStream, OutputMessage, ResponseFragment, Role};

    use super::*;

    struct CannedLLM {
        fragments: Vec<&'static str>,
        complete: bool,
        requests: Vec<Request>,
    }

    impl CannedLLM {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                complete: true,
                requests: vec![],
            }
        }
    }

    impl LLM for CannedLLM {
        fn send_request_stream(&mut self, req: Request) -> LLMStream<'_> {
            self.requests.push(req);
            let mut items: Vec<Result<ResponseFragment>> = self
                .fragments
                .iter()
                .map(|f| Ok(ResponseFragment::TextDelta(f.to_string())))
                .collect();
            if self.complete {
                items.push(Ok(ResponseFragment::MessageComplete(OutputMessage {
                    input_tokens: 10,
                    output_tokens: 5,
                    text: self.fragments.concat(),
                })));
            }
            Box::pin(tokio_stream::iter(items))
        }
    }

    struct FailingLLM;

    impl LLM for FailingLLM {
        fn send_request_stream(&mut self, _req: Request) -> LLMStream<'_> {
            Box::pin(tokio_stream::iter([Err::<ResponseFragment, _>(eyre!("boom"))]))
        }
    }

    #[test]
    fn extracts_between_markers() {
        let response = "Sure!\n[Start of Imagen 3 Prompt]\n  A red fox in snow, 4K.  \n[End of Imagen 3 Prompt]\nEnjoy";
        assert_eq!(
            extract_prompt(response),
            ExtractedPrompt::Marked("A red fox in snow, 4K.".into())
        );
    }

    #[test]
    fn missing_markers_keep_full_text() {
        let response = "  A red fox in snow  ";
        assert_eq!(
            extract_prompt(response),
            ExtractedPrompt::Unmarked(response.into())
        );

        let only_start = "[Start of Imagen 3 Prompt] A red fox";
        assert_eq!(
            extract_prompt(only_start),
            ExtractedPrompt::Unmarked(only_start.into())
        );

        let reversed = "[End of Imagen 3 Prompt] fox [Start of Imagen 3 Prompt]";
        assert_eq!(
            extract_prompt(reversed),
            ExtractedPrompt::Unmarked(reversed.into())
        );
    }

    #[test]
    fn empty_marked_section() {
        assert_eq!(
            extract_prompt("[Start of Imagen 3 Prompt][End of Imagen 3 Prompt]"),
            ExtractedPrompt::Marked(String::new())
        );
    }

    #[test]
    fn request_embeds_prompt_and_guide() {
        let req = construct_request("a cat", "GUIDE TEXT {not a placeholder}", 480);

        assert!(req.system.is_none());
        assert_eq!(req.max_tokens, 480);
        assert_eq!(req.sampling, SAMPLING);
        let [msg] = &req.messages[..] else {
            panic!("expected exactly one message");
        };
        assert_eq!(msg.role, Role::User);
        assert!(msg.content.contains("**User's Initial Prompt:**\na cat\n"));
        assert!(msg.content.contains("GUIDE TEXT {not a placeholder}"));
        assert!(msg.content.starts_with("You are an expert prompt engineer"));
        assert!(msg.content.contains("\n    - Enhancing facial details\n"));
        assert!(msg.content.contains(
            "\n    - **Image Quality Modifiers:** Include quality-enhancing keywords like 'high-quality'"
        ));
        assert!(msg.content.contains("**Example of expected output format:**"));
        assert_eq!(msg.content.matches(START_MARKER).count(), 3);
        assert_eq!(msg.content.matches(END_MARKER).count(), 3);
    }

    #[tokio::test]
    async fn refine_uses_marked_prompt() -> Result<()> {
        let mut llm = CannedLLM::new(vec![
            "[Start of Imagen 3 Prompt]\nA tabby",
            " cat, studio light\n",
            "[End of Imagen 3 Prompt]",
        ]);
        let refined = refine_prompt(&mut llm, "cat", "", 480).await?;
        assert_eq!(refined, "A tabby cat, studio light");
        assert_eq!(llm.requests.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn refine_falls_back_to_full_text() -> Result<()> {
        let mut llm = CannedLLM::new(vec!["A tabby cat"]);
        assert_eq!(refine_prompt(&mut llm, "cat", "", 480).await?, "A tabby cat");
        Ok(())
    }

    #[tokio::test]
    async fn incomplete_stream_is_an_error() {
        let mut llm = CannedLLM::new(vec!["A tabby"]);
        llm.complete = false;
        assert!(refine_prompt(&mut llm, "cat", "", 480).await.is_err());
    }

    #[tokio::test]
    async fn llm_errors_propagate() {
        let err = refine_prompt(&mut FailingLLM, "cat", "", 480)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
