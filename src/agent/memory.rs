use super::chain::ToolStep;

/// Last output of each tool kind within one orchestration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMemory {
    retrieval: Option<String>,
    code_analysis: Option<String>,
    model: Option<String>,
}

impl RunMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites only the slot belonging to `step`.
    pub fn record(&mut self, step: ToolStep, output: String) {
        let slot = match step {
            ToolStep::Retrieval => &mut self.retrieval,
            ToolStep::CodeAnalysis => &mut self.code_analysis,
            ToolStep::ModelInference => &mut self.model,
        };
        *slot = Some(output);
    }

    pub fn get(&self, step: ToolStep) -> Option<&str> {
        match step {
            ToolStep::Retrieval => self.retrieval.as_deref(),
            ToolStep::CodeAnalysis => self.code_analysis.as_deref(),
            ToolStep::ModelInference => self.model.as_deref(),
        }
    }

    pub fn retrieval(&self) -> Option<&str> {
        self.retrieval.as_deref()
    }

    pub fn code_analysis(&self) -> Option<&str> {
        self.code_analysis.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.retrieval.is_none() && self.code_analysis.is_none() && self.model.is_none()
    }

    /// `input` followed by labeled sections for whatever context is present.
    pub fn augment_prompt(&self, input: &str) -> String {
        let mut prompt = input.to_string();
        if let Some(docs) = &self.retrieval {
            prompt.push_str("\n\nRelevant Docs:\n");
            prompt.push_str(docs);
        }
        if let Some(analysis) = &self.code_analysis {
            prompt.push_str("\n\nCode Analysis:\n");
            prompt.push_str(analysis);
        }
        prompt
    }
}
