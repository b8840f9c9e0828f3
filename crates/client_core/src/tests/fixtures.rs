//! Builders shared by the unit tests of this crate.

use shared::domain::{FinalSlide, Outline, SlideDesign, SlideOutline};

pub(crate) fn outline_with(titles: &[&str]) -> Outline {
    Outline {
        topic: "topic".to_string(),
        title: "Deck".to_string(),
        subtitle: "sub".to_string(),
        target_audience: "engineers".to_string(),
        presentation_goal: "inform".to_string(),
        tone: "calm".to_string(),
        visual_theme: "dark".to_string(),
        accent_color: "#336699".to_string(),
        research_context: String::new(),
        slides: titles
            .iter()
            .map(|title| SlideOutline {
                title: title.to_string(),
                purpose: "p".to_string(),
                visual_advice: "v".to_string(),
            })
            .collect(),
    }
}

pub(crate) fn slide(index: usize) -> FinalSlide {
    FinalSlide {
        index,
        outline: SlideOutline {
            title: format!("Slide {index}"),
            purpose: "p".to_string(),
            visual_advice: "v".to_string(),
        },
        design: SlideDesign {
            title: format!("Slide {index}"),
            subtitle: String::new(),
            content: vec!["point".to_string()],
            image_prompt: "prompt".to_string(),
            html_content: "<h1>x</h1>".to_string(),
            design_directive: String::new(),
            stats: Vec::new(),
        },
        image_url: String::new(),
        final_html: format!("<h1>Slide {index}</h1>"),
    }
}
