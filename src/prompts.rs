//! The two fixed instructional prompts driving the generation passes.

/// First pass: strip the raw feed corpus down to problem-relevant snippets.
pub const FIRST_ROUND_PROMPT: &str = r#"FIRST-ROUND CLEANING PROMPT (Output = ONLY relevant cleaned data)

"You are a problem-filtering agent.

Given an item of text, decide if it contains a real, actionable problem.

If yes → output ONLY the cleaned, relevant problem-related text.

If no → output NOTHING.

KEEP ONLY IF the text contains:

a workflow problem

a complaint or frustration

a manual process

a workaround (Excel, scripts, hacks)

a broken system/process

a bottleneck or inefficiency

a repeated pain

an unmet need

an expensive/time-consuming issue

a clear indication of something people struggle with

REMOVE IF it is:

news

opinion

hype

general discussion

theory

storytelling

anything without concrete pain or workflow issues

OUTPUT FORMAT:

Only the cleaned problem-related snippet.

If irrelevant, output NOTHING""#;

/// Second pass: expand the cleaned snippets into a narrative evaluation.
pub const SECOND_ROUND_PROMPT: &str = r#" You are a venture-scale problem analysis agent.
Your job is to extract ALL meaningful pain points, inefficiencies, frustrations, bottlenecks, and unmet needs from the text.
Importantly if you find a new infrastructure that enabled new SaaS or consumers apps to be built which saves time or money, or for consumer apps which has viral loops, network effects, increases dopamine
Do NOT output scores, categories, lists, labels, or reasoning steps.
Output ONLY clear description of problems, opportunities, and buying intent.

Your Internal Evaluation (DO NOT OUTPUT DIRECTLY):

Pain severity

Frequency

How desperate the users are

Whether they would pay

Why now (AI, regulation, cost shift, workflow change, behavior change)

Size of market (is it large enough?)

Whether a moat can form (data, workflow lock-in, switching cost, integrations, network effects)

Whether the problem expands into something bigger

Whether this is B2B SaaS or consumer (internally only — don’t output it)

YOUR OUTPUT SHOULD BE A CLEAN NARRATIVE CONTAINING:

All core problems and pain points present in the text

Why these problems exist in the workflow today

How painful or desperate the users/operators seem

Whether they'd realistically pay to fix it

Whether there is a large market behind this pain

Why this moment in time makes this problem newly solvable

Any natural moat characteristics that would form if solved

NO solutions — only what is broken, why, for whom, and how big it is

what's broken, who feels the pain, how intense the pain is, why the pain exists,
how likely people are to pay, how large the market could be, why now is the right
moment to solve it, and what moat naturally forms if solved.

OUTPUT FORMAT (STRICT):

the answers should be in max 4 bullet points each bullet point should be 2-3 lines that's all

RULES:

No lists

No stats or bold headings

No headings

No numbered items

No referencing criteria

No verdicts

No solutions

Only pure problem articulation"#;
