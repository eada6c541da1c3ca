use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};
use crate::models::{Counter, SourceItem};
use crate::state::{
    base_section, counter_section, entries, BaseSection, CounterSection, CurrentItem, ListEntry,
    Section,
};
use crate::store::Snapshot;

// Body lines shown on each card.
const CARD_BODY_LINES: usize = 2;

pub fn draw(frame: &mut Frame, app: &App) {
    let snapshot = app.snapshot();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(0),    // Drawer + list + detail
            Constraint::Length(1), // Status line
        ])
        .split(frame.area());

    render_header(frame, &snapshot, chunks[0]);

    let mut body = chunks[1];
    if app.drawer.is_open() {
        let split = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(app.drawer_width), Constraint::Min(0)])
            .split(body);
        render_drawer(frame, app, &snapshot, split[0]);
        body = split[1];
    }

    match app.selection.current().filter(|_| app.selection.is_open()) {
        Some(current) => {
            let split = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Ratio(2, 5), // Master list
                    Constraint::Ratio(3, 5), // Detail
                ])
                .split(body);
            render_item_list(frame, app, &snapshot, split[0]);
            render_detail(frame, app, &snapshot, current, split[1]);
        }
        None => render_item_list(frame, app, &snapshot, body),
    }

    render_status(frame, app, chunks[2]);

    if app.show_help {
        render_help(frame);
    }
}

fn render_header(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let analyzed = snapshot
        .analyses()
        .iter()
        .filter(|a| a.report.has_content())
        .count();
    let stats = format!(
        " {} Sources | {} Stories | {} Analyzed",
        snapshot.sources().len(),
        snapshot.source_items().len(),
        analyzed
    );

    let block = Block::default()
        .title(" Insight Beam ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(stats).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M").to_string()
}

fn card(entry: &ListEntry<'_>, width: usize) -> ListItem<'static> {
    let item = entry.item;
    let mut lines = vec![Line::from(Span::styled(
        item.title.clone(),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    ))];

    let mut subheader = Vec::new();
    if !item.authors.is_empty() {
        subheader.push(Span::styled(
            format!("{} · ", item.authors.join(", ")),
            Style::default().fg(Color::Gray),
        ));
    }
    subheader.push(Span::styled(
        entry.source_label().to_string(),
        Style::default().fg(Color::Blue),
    ));
    subheader.push(Span::styled(
        format!(
            " · posted {} · updated {}",
            format_time(&item.posted),
            format_time(&item.updated)
        ),
        Style::default().fg(Color::DarkGray),
    ));
    lines.push(Line::from(subheader));

    for body_line in textwrap::wrap(&item.content, width.max(10))
        .into_iter()
        .take(CARD_BODY_LINES)
    {
        lines.push(Line::from(Span::styled(
            body_line.into_owned(),
            Style::default().fg(Color::Gray),
        )));
    }

    lines.push(Line::from(Span::styled(
        "[Enter] Analysis",
        Style::default().fg(Color::Magenta),
    )));
    lines.push(Line::from(""));

    ListItem::new(lines)
}

fn render_item_list(frame: &mut Frame, app: &App, snapshot: &Snapshot, area: Rect) {
    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = entries(snapshot)
        .iter()
        .map(|entry| card(entry, width))
        .collect();

    if items.is_empty() {
        let paragraph = Paragraph::new("No articles yet. Press 's' to manage sources.")
            .block(Block::default().title(" Articles ").borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }

    let list = List::new(items)
        .block(Block::default().title(" Articles ").borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.list.selected));

    frame.render_stateful_widget(list, area, &mut state);
}

fn section_header(app: &App, section: Section) -> Line<'static> {
    let marker = if app.detail.is_expanded(section) { "▾" } else { "▸" };
    let number = Section::ALL
        .iter()
        .position(|s| *s == section)
        .map_or(0, |i| i + 1);
    Line::from(Span::styled(
        format!("{marker} {number} {}", section.title()),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
}

fn generating_line() -> Vec<Line<'static>> {
    vec![Line::from(Span::styled(
        "  Generating…",
        Style::default().fg(Color::Yellow),
    ))]
}

fn placeholder(app: &App, section: Section, missing: &str, key: char) -> Vec<Line<'static>> {
    if app.detail.generating() == Some(section) {
        return generating_line();
    }
    vec![
        Line::from(Span::styled(
            format!("  {missing} not found."),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            format!("  [{key}] Generate"),
            Style::default().fg(Color::Magenta),
        )),
    ]
}

fn failed(app: &App, section: Section, error: &str, key: char) -> Vec<Line<'static>> {
    if app.detail.generating() == Some(section) {
        return generating_line();
    }
    vec![
        Line::from(Span::styled(
            format!("  Generation failed: {error}"),
            Style::default().fg(Color::Red),
        )),
        Line::from(Span::styled(
            format!("  [{key}] Retry"),
            Style::default().fg(Color::Magenta),
        )),
    ]
}

fn content_lines(item: &SourceItem) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            format!("  {}", item.title),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("  {}", item.content)),
    ]
}

fn analysis_lines(app: &App, current: &CurrentItem) -> Vec<Line<'static>> {
    match base_section(current) {
        BaseSection::Present(analysis) => {
            let mut lines = vec![Line::from(vec![
                Span::styled("  Subject: ", Style::default().fg(Color::Gray)),
                Span::raw(analysis.subject.clone()),
            ])];
            for view_point in &analysis.view_points {
                lines.push(Line::from(format!("  • {}", view_point.point)));
                for argument in &view_point.arguments {
                    lines.push(Line::from(Span::styled(
                        format!("      - {argument}"),
                        Style::default().fg(Color::Gray),
                    )));
                }
            }
            lines
        }
        BaseSection::NotFound => placeholder(app, Section::Analysis, "Analysis", 'a'),
        BaseSection::Failed(error) => failed(app, Section::Analysis, error, 'a'),
    }
}

fn counter_lines(counter: &Counter, snapshot: &Snapshot) -> Vec<Line<'static>> {
    let origin = snapshot
        .item(counter.counter_source_item_uuid)
        .map(|item| item.title.clone())
        .unwrap_or_else(|| format!("article {}", counter.counter_source_item_uuid));
    vec![
        Line::from(vec![
            Span::styled("  Original: ", Style::default().fg(Color::Gray)),
            Span::raw(counter.original_view_point.clone()),
        ]),
        Line::from(vec![
            Span::styled("  Counter:  ", Style::default().fg(Color::Gray)),
            Span::raw(counter.counter_view_point.clone()),
            Span::styled(format!(" ({origin})"), Style::default().fg(Color::Blue)),
        ]),
        Line::from(vec![
            Span::styled("  Arguments: ", Style::default().fg(Color::Gray)),
            Span::raw(counter.arguments.join("; ")),
        ]),
        Line::from(""),
    ]
}

fn render_detail(
    frame: &mut Frame,
    app: &App,
    snapshot: &Snapshot,
    current: &CurrentItem,
    area: Rect,
) {
    let mut lines = Vec::new();
    for section in Section::ALL {
        lines.push(section_header(app, section));
        if !app.detail.is_expanded(section) {
            continue;
        }
        match section {
            Section::Content => lines.extend(content_lines(&current.article)),
            Section::Analysis => lines.extend(analysis_lines(app, current)),
            Section::Counters => match counter_section(current) {
                CounterSection::Present(counters) => {
                    for counter in counters {
                        lines.extend(counter_lines(counter, snapshot));
                    }
                }
                CounterSection::NotFound => {
                    lines.extend(placeholder(app, Section::Counters, "Counter analysis", 'c'))
                }
                CounterSection::Failed(error) => {
                    lines.extend(failed(app, Section::Counters, error, 'c'))
                }
            },
        }
        lines.push(Line::from(""));
    }

    let source = current
        .source
        .as_ref()
        .map(|s| s.title.as_str())
        .unwrap_or(crate::state::UNKNOWN_SOURCE);
    let block = Block::default()
        .title(format!(" {source} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn render_drawer(frame: &mut Frame, app: &App, snapshot: &Snapshot, area: Rect) {
    let input_height = if app.drawer.is_adding() { 4 } else { 3 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(input_height)])
        .split(area);

    let items: Vec<ListItem> = snapshot
        .sources()
        .iter()
        .map(|source| {
            let count = snapshot.items_for_source(source.uuid).count();
            ListItem::new(Line::from(vec![
                Span::styled("⤓ ", Style::default().fg(Color::Yellow)),
                Span::raw(source.title.clone()),
                Span::styled(format!(" ({count})"), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Sources ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let mut state = ListState::default();
    if !snapshot.sources().is_empty() {
        state.select(Some(app.drawer.cursor));
    }
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let mut lines = match app.drawer.url_field() {
        Some(url) => vec![Line::from(format!("> {url}_"))],
        None if app.is_adding_source() => vec![Line::from(Span::styled(
            "Adding source…",
            Style::default().fg(Color::Yellow),
        ))],
        None => vec![Line::from(Span::styled(
            "a:add  d:pull",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    if let Some(feedback) = app.drawer.feedback() {
        lines.push(Line::from(Span::styled(
            feedback.to_string(),
            Style::default().fg(Color::Red),
        )));
    }

    let title = if app.drawer.is_adding() { " Add source URL " } else { "" };
    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, chunks[1]);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = if app.is_pulling() {
        "Pulling feeds...".to_string()
    } else if let Some(status) = &app.status {
        status.clone()
    } else {
        match app.input_mode() {
            InputMode::Detail => {
                "1-3:sections  a:analyze  c:counter  o:open  esc:close  ?:help".to_string()
            }
            InputMode::Drawer => "j/k:nav  a:add  d:pull  esc:close".to_string(),
            InputMode::AddSource => "enter:add  esc:cancel".to_string(),
            _ => "j/k:nav  enter:analysis  s:sources  r:refresh  ?:help  q:quit".to_string(),
        }
    };

    let paragraph = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 70, frame.area());

    let help_text = vec![
        "",
        " Articles:",
        "   j / ↓    Move down",
        "   k / ↑    Move up",
        "   < / >    First / last article",
        "   Enter    Show analysis",
        "   l        Re-open last analysis",
        "   o        Open in browser",
        "",
        " Analysis:",
        "   1 2 3    Toggle content / analysis / counters",
        "   a        Generate analysis",
        "   c        Generate counter analysis",
        "   Esc      Close",
        "",
        " Sources:",
        "   s / Tab  Toggle sources drawer",
        "   a        Add source (also from the article list)",
        "   d        Pull new items",
        "   r        Refresh all sources",
        "",
        " General:",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::{backend::TestBackend, Terminal};

    use super::*;
    use crate::config::Config;
    use crate::db::Repository;
    use crate::models::{Analysis, AnalysisReport, ArticleAnalysis};
    use crate::services::Unavailable;
    use crate::state::SelectionState;
    use crate::store::fixtures::{item, source};

    async fn app_with(snapshot: Snapshot) -> App {
        let config = Config {
            db_path: ":memory:".to_string(),
            api_key: None,
            model: crate::ai::DEFAULT_MODEL.to_string(),
            seed_demo_data: false,
            pull_limit: 10,
            drawer_width: 30,
            log_path: None,
        };
        let repository = Repository::new(":memory:").await.unwrap();
        let mut app = App::with_services(
            &config,
            repository,
            Arc::new(Unavailable("Feeds")),
            Arc::new(Unavailable("Analysis")),
        )
        .await
        .unwrap();
        app.selection = SelectionState::initial(&snapshot);
        app.store.replace(snapshot);
        app
    }

    fn render(app: &App) -> Vec<String> {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();

        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    fn screen_contains(lines: &[String], needle: &str) -> bool {
        lines.iter().any(|line| line.contains(needle))
    }

    #[tokio::test]
    async fn card_shows_resolved_source_name() {
        let snapshot =
            Snapshot::new(vec![source(2, "Fox")], vec![item(1, 2, "Headline")], vec![]).unwrap();
        let app = app_with(snapshot).await;

        let lines = render(&app);
        let subheader = lines
            .iter()
            .find(|line| line.contains("posted"))
            .expect("card subheader");
        assert!(subheader.contains("Fox"));
        assert!(screen_contains(&lines, "Headline"));
    }

    #[tokio::test]
    async fn card_falls_back_for_unknown_source() {
        let snapshot = Snapshot::new(vec![], vec![item(1, 9, "Orphan")], vec![]).unwrap();
        let app = app_with(snapshot).await;

        assert!(screen_contains(&render(&app), "Unknown source"));
    }

    #[tokio::test]
    async fn empty_viewpoints_still_show_subject() {
        let record = ArticleAnalysis::new(
            1,
            AnalysisReport::Analyzed {
                analysis: Some(Analysis {
                    subject: "X".to_string(),
                    view_points: vec![],
                }),
                counters: None,
            },
        );
        let snapshot =
            Snapshot::new(vec![source(2, "Fox")], vec![item(1, 2, "Headline")], vec![record])
                .unwrap();
        let mut app = app_with(snapshot).await;
        app.handle_action(crate::tui::AppAction::OpenDetail).await.unwrap();
        app.detail.expand(Section::Analysis);

        let lines = render(&app);
        assert!(screen_contains(&lines, "Subject: X"));
        assert!(!screen_contains(&lines, "Analysis not found"));
        assert!(!screen_contains(&lines, "•"));
    }

    #[tokio::test]
    async fn missing_record_shows_both_placeholders() {
        let snapshot =
            Snapshot::new(vec![source(2, "Fox")], vec![item(1, 2, "Headline")], vec![]).unwrap();
        let mut app = app_with(snapshot).await;
        app.handle_action(crate::tui::AppAction::OpenDetail).await.unwrap();
        app.detail.expand(Section::Analysis);
        app.detail.expand(Section::Counters);

        let lines = render(&app);
        assert!(screen_contains(&lines, "Analysis not found."));
        assert!(screen_contains(&lines, "Counter analysis not found."));
        assert!(screen_contains(&lines, "[a] Generate"));
        assert!(screen_contains(&lines, "[c] Generate"));
    }

    #[tokio::test]
    async fn retry_replaces_failure_with_progress() {
        let record = ArticleAnalysis::new(
            1,
            AnalysisReport::Failed {
                error: "overloaded".to_string(),
            },
        );
        let snapshot =
            Snapshot::new(vec![source(2, "Fox")], vec![item(1, 2, "Headline")], vec![record])
                .unwrap();
        let mut app = app_with(snapshot).await;
        app.handle_action(crate::tui::AppAction::OpenDetail).await.unwrap();
        app.detail.expand(Section::Analysis);
        assert!(screen_contains(&render(&app), "Generation failed: overloaded"));

        app.detail.set_generating(Some(Section::Analysis));
        let lines = render(&app);
        assert!(screen_contains(&lines, "Generating…"));
        assert!(!screen_contains(&lines, "Generation failed"));
    }

    #[tokio::test]
    async fn drawer_lists_sources_and_feedback() {
        let snapshot =
            Snapshot::new(vec![source(2, "Fox")], vec![item(1, 2, "Headline")], vec![]).unwrap();
        let mut app = app_with(snapshot).await;
        app.drawer.open();
        app.drawer.add();
        app.drawer.input('x');
        let _ = app.drawer.confirm();

        let lines = render(&app);
        assert!(screen_contains(&lines, "Sources"));
        assert!(screen_contains(&lines, "> x_"));
        assert!(screen_contains(&lines, "not a valid URL"));
    }
}
