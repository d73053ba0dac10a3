//! Shared demo posts for the CLI, benches and tests.

use once_cell::sync::Lazy;

pub struct DemoPost {
    pub slug: &'static str,
    pub title: &'static str,
    pub subtitle: Option<&'static str>,
    pub description: &'static str,
    pub category: &'static str,
    pub tags: &'static [&'static str],
    /// ISO-8601 publish date
    pub date: &'static str,
    pub body: &'static str,
}

/// Categories the blog offers as filter checkboxes, in display order.
pub const POST_CATEGORIES: &[&str] = &["Essay", "Note", "Tutorial"];

pub const DEMO_POSTS: &[DemoPost] = &[
    DemoPost {
        slug: "test-post-1",
        title: "Test Post One",
        subtitle: None,
        description: "This is a test post for E2E testing with search functionality",
        category: "Essay",
        tags: &["testing", "e2e", "playwright"],
        date: "2024-01-01",
        body: "This is test content with bold and italic text for search testing.\n\n\
               Code Example\n\
               const test = \"hello world\";\n\
               console.log(test);\n\n\
               Some additional content to test search functionality and reading time calculation.",
    },
    DemoPost {
        slug: "test-post-2",
        title: "Second Test Article",
        subtitle: Some("Category filtering walkthrough"),
        description: "A second test post for category filtering tests",
        category: "Tutorial",
        tags: &["tutorial", "guide", "testing"],
        date: "2024-01-02",
        body: "This article is in the Tutorial category to test category filtering.\n\n\
               Table of Contents Testing\n\
               This post has multiple headings to test table of contents generation.\n\
               Subheading One: content under first subheading.\n\
               Subheading Two: content under second subheading.\n\
               Deep Subheading: content under deep subheading for TOC testing.",
    },
    DemoPost {
        slug: "test-featured-post",
        title: "Featured Test Post",
        subtitle: None,
        description: "A featured post for testing most popular section",
        category: "Tutorial",
        tags: &["featured", "testing", "popular"],
        date: "2024-01-03",
        body: "This is a featured post that should appear in the \"Most Popular\" section.\n\n\
               MDX Component Testing\n\
               <TwitterEmbed id=\"1234567890\" />\n\
               <YouTubeEmbed id=\"dQw4w9WgXcQ\" />\n\n\
               Newsletter Component\n\
               <Newsletter />\n\n\
               More content to ensure proper rendering and component functionality.",
    },
    DemoPost {
        slug: "search-test-post",
        title: "Unique Search Terms Post",
        subtitle: None,
        description: "A post with unique searchable content for testing fuzzy search",
        category: "Note",
        tags: &["search", "unique", "fuzzy"],
        date: "2024-01-04",
        body: "This post contains unique searchable terms like \"xylophone\" and \"quaternary\" \
               for testing search functionality.\n\n\
               Special Characters and Content\n\
               Testing search with special characters: @mention #hashtag and email@example.com\n\n\
               interface TestInterface { uniqueProperty: string; specialValue: number; }\n\n\
               The word \"xylophone\" should be easily searchable and highlighted in results.",
    },
    DemoPost {
        slug: "escaping-html-in-mdx",
        title: "Escaping HTML in MDX",
        subtitle: Some("Why <script> tags never make it to the page"),
        description: "Notes on keeping inline markup inert when rendering search excerpts",
        category: "Note",
        tags: &["security", "mdx"],
        date: "2024-02-11",
        body: "A reader once pasted <script>alert(1)</script> into a comment and expected it \
               to run. Search excerpts strip angle brackets before highlighting, so the \
               snippet shows the words but never the tag.",
    },
    DemoPost {
        slug: "debouncing-search-input",
        title: "Debouncing Search Input",
        subtitle: None,
        description: "Leading and trailing edge debouncing for instant search boxes",
        category: "Essay",
        tags: &["performance", "react"],
        date: "2024-03-20",
        body: "The first keystroke should feel instant. Everything after that can wait until \
               the typing settles, as long as the final query always wins over stale responses \
               that arrive late.",
    },
];

/// Distinct categories actually used by `DEMO_POSTS`, in first-seen order.
pub static USED_CATEGORIES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut seen: Vec<&'static str> = Vec::new();
    for post in DEMO_POSTS {
        if !seen.contains(&post.category) {
            seen.push(post.category);
        }
    }
    seen
});
