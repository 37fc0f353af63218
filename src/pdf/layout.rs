use super::TextLine;

/// Fragments whose tops differ by at most this many points share a line.
const LINE_TOLERANCE: f32 = 3.0;
/// Horizontal gap, relative to font size, that reads as a word break.
const WORD_GAP_RATIO: f32 = 0.15;

/// Text emitted by a single show operator, positioned in page space.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fragment {
    pub(crate) text: String,
    pub(crate) x0: f32,
    pub(crate) x1: f32,
    pub(crate) top: f32,
    pub(crate) bottom: f32,
    pub(crate) size: f32,
}

/// Clusters fragments into lines ordered top to bottom, each read left to right.
pub(crate) fn group_lines(mut fragments: Vec<Fragment>) -> Vec<TextLine> {
    fragments.retain(|fragment| !fragment.text.is_empty());
    fragments.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0)));

    let mut clusters: Vec<Vec<Fragment>> = Vec::new();
    let mut last_top = f32::NEG_INFINITY;
    for fragment in fragments {
        let joins = (fragment.top - last_top).abs() <= LINE_TOLERANCE;
        last_top = fragment.top;
        match clusters.last_mut() {
            Some(cluster) if joins => cluster.push(fragment),
            _ => clusters.push(vec![fragment]),
        }
    }

    clusters.into_iter().filter_map(build_line).collect()
}

fn build_line(mut cluster: Vec<Fragment>) -> Option<TextLine> {
    cluster.sort_by(|a, b| a.x0.total_cmp(&b.x0));

    let mut text = String::new();
    let mut prev: Option<&Fragment> = None;
    for fragment in &cluster {
        if let Some(prev) = prev {
            let gap = fragment.x0 - prev.x1;
            let threshold = prev.size.max(fragment.size) * WORD_GAP_RATIO;
            let boundary_space = text.ends_with(char::is_whitespace)
                || fragment.text.starts_with(char::is_whitespace);
            if gap > threshold && !boundary_space {
                text.push(' ');
            }
        }
        text.push_str(&fragment.text);
        prev = Some(fragment);
    }

    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    let mut line = TextLine {
        text,
        x0: f32::INFINITY,
        x1: f32::NEG_INFINITY,
        top: f32::INFINITY,
        bottom: f32::NEG_INFINITY,
        font_size: 0.0,
    };
    for fragment in &cluster {
        line.x0 = line.x0.min(fragment.x0);
        line.x1 = line.x1.max(fragment.x1);
        line.top = line.top.min(fragment.top);
        line.bottom = line.bottom.max(fragment.bottom);
        line.font_size = line.font_size.max(fragment.size);
    }
    Some(line)
}
