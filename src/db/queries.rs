use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    BlogPost, Booking, BookingStatus, BookingWizard, Client, ConsultantSettings, ContactMessage,
    NewBooking, Project, ProjectCategory, User, UserRole, WorkingHours,
};

pub fn timestamp() -> String {
    Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, request_id, client_name, client_email, client_phone, company_name, preferred_date, message, status, created_at";

/// Inserts a booking once per request id. A repeated request id returns the
/// row stored by the first attempt instead of creating a duplicate.
pub fn insert_booking(conn: &Connection, booking: &NewBooking) -> anyhow::Result<Booking> {
    let request_id = booking.request_id.to_string();
    if let Some(existing) = get_booking_by_request_id(conn, &request_id)? {
        tracing::info!(request_id = %request_id, booking_id = %existing.id, "duplicate booking request ignored");
        return Ok(existing);
    }

    let stored = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        request_id: Some(request_id),
        client_name: booking.client_name.clone(),
        client_email: booking.client_email.clone(),
        client_phone: booking.client_phone.clone(),
        company_name: booking.company_name.clone(),
        preferred_date: booking.preferred_date,
        message: booking.message.clone(),
        status: booking.status,
        created_at: Utc::now(),
    };

    conn.execute(
        "INSERT INTO bookings (id, request_id, client_name, client_email, client_phone, company_name, preferred_date, message, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            stored.id,
            stored.request_id,
            stored.client_name,
            stored.client_email,
            stored.client_phone,
            stored.company_name,
            stored.preferred_date.to_rfc3339(),
            stored.message,
            stored.status.as_str(),
            stored.created_at.to_rfc3339(),
        ],
    )?;
    Ok(stored)
}

pub fn get_booking_by_request_id(
    conn: &Connection,
    request_id: &str,
) -> anyhow::Result<Option<Booking>> {
    let row = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE request_id = ?1"),
            params![request_id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;
    row.transpose()
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let row = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            |row| Ok(parse_booking_row(row)),
        )
        .optional()?;
    row.transpose()
}

pub fn list_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE ?1 IS NULL OR status = ?1
         ORDER BY preferred_date DESC LIMIT ?2"
    ))?;

    let rows = stmt.query_map(
        params![status_filter.map(|s| s.as_str()), limit],
        |row| Ok(parse_booking_row(row)),
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let preferred_date: String = row.get(6)?;
    let status: String = row.get(8)?;
    let created_at: String = row.get(9)?;

    Ok(Booking {
        id: row.get(0)?,
        request_id: row.get(1)?,
        client_name: row.get(2)?,
        client_email: row.get(3)?,
        client_phone: row.get(4)?,
        company_name: row.get(5)?,
        preferred_date: DateTime::parse_from_rfc3339(&preferred_date)?,
        message: row.get(7)?,
        status: BookingStatus::parse(&status),
        created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
    })
}

// ── Consultant Settings ──

pub fn get_consultant_settings(conn: &Connection) -> anyhow::Result<Option<ConsultantSettings>> {
    let row = conn
        .query_row(
            "SELECT consultant_name, photo_url, working_hours FROM consultant_settings WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        Some((consultant_name, photo_url, hours_json)) => {
            let working_hours: WorkingHours = serde_json::from_str(&hours_json)?;
            Ok(Some(ConsultantSettings {
                consultant_name,
                photo_url,
                working_hours,
            }))
        }
        None => Ok(None),
    }
}

pub fn save_consultant_settings(
    conn: &Connection,
    settings: &ConsultantSettings,
) -> anyhow::Result<()> {
    let hours_json = serde_json::to_string(&settings.working_hours)?;
    conn.execute(
        "INSERT INTO consultant_settings (id, consultant_name, photo_url, working_hours)
         VALUES (1, ?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET
           consultant_name = excluded.consultant_name,
           photo_url = excluded.photo_url,
           working_hours = excluded.working_hours,
           updated_at = datetime('now')",
        params![settings.consultant_name, settings.photo_url, hours_json],
    )?;
    Ok(())
}

// ── Wizard Sessions ──

pub fn get_wizard_session(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingWizard>> {
    let state: Option<String> = conn
        .query_row(
            "SELECT state FROM wizard_sessions WHERE id = ?1 AND expires_at > ?2",
            params![id, timestamp()],
            |row| row.get(0),
        )
        .optional()?;

    match state {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Stores the wizard and pushes its expiry `ttl_minutes` into the future.
pub fn save_wizard_session(
    conn: &Connection,
    id: &str,
    wizard: &BookingWizard,
    ttl_minutes: i64,
) -> anyhow::Result<()> {
    let state = serde_json::to_string(wizard)?;
    let expires_at = (Utc::now() + Duration::minutes(ttl_minutes))
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    conn.execute(
        "INSERT INTO wizard_sessions (id, state, expires_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET state = excluded.state, expires_at = excluded.expires_at",
        params![id, state, expires_at],
    )?;
    Ok(())
}

pub fn expire_old_wizard_sessions(conn: &Connection) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM wizard_sessions WHERE expires_at <= ?1",
        params![timestamp()],
    )?;
    Ok(count)
}

// ── Blog Posts ──

const BLOG_COLUMNS: &str = "id, title, slug, excerpt, content, cover_image_url, published, published_at, created_at, updated_at";

pub fn list_blog_posts(conn: &Connection, published_only: bool) -> anyhow::Result<Vec<BlogPost>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BLOG_COLUMNS} FROM blog_posts
         WHERE ?1 = 0 OR published = 1
         ORDER BY COALESCE(published_at, created_at) DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![published_only as i32], parse_blog_row)?;

    let mut posts = vec![];
    for row in rows {
        posts.push(row?);
    }
    Ok(posts)
}

pub fn get_blog_post(conn: &Connection, id: &str) -> anyhow::Result<Option<BlogPost>> {
    Ok(conn
        .query_row(
            &format!("SELECT {BLOG_COLUMNS} FROM blog_posts WHERE id = ?1"),
            params![id],
            parse_blog_row,
        )
        .optional()?)
}

pub fn get_published_post_by_slug(conn: &Connection, slug: &str) -> anyhow::Result<Option<BlogPost>> {
    Ok(conn
        .query_row(
            &format!("SELECT {BLOG_COLUMNS} FROM blog_posts WHERE slug = ?1 AND published = 1"),
            params![slug],
            parse_blog_row,
        )
        .optional()?)
}

pub fn create_blog_post(conn: &Connection, post: &BlogPost) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO blog_posts (id, title, slug, excerpt, content, cover_image_url, published, published_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            post.id,
            post.title,
            post.slug,
            post.excerpt,
            post.content,
            post.cover_image_url,
            post.published as i32,
            post.published_at,
            post.created_at,
            post.updated_at,
        ],
    )?;
    Ok(())
}

pub fn update_blog_post(conn: &Connection, post: &BlogPost) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE blog_posts SET title = ?1, slug = ?2, excerpt = ?3, content = ?4, cover_image_url = ?5,
           published = ?6, published_at = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            post.title,
            post.slug,
            post.excerpt,
            post.content,
            post.cover_image_url,
            post.published as i32,
            post.published_at,
            timestamp(),
            post.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_blog_post(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM blog_posts WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_blog_row(row: &rusqlite::Row) -> rusqlite::Result<BlogPost> {
    Ok(BlogPost {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        excerpt: row.get(3)?,
        content: row.get(4)?,
        cover_image_url: row.get(5)?,
        published: row.get::<_, i32>(6)? != 0,
        published_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

// ── Clients ──

pub fn list_clients(conn: &Connection) -> anyhow::Result<Vec<Client>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, logo_url, website, created_at FROM clients ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], parse_client_row)?;

    let mut clients = vec![];
    for row in rows {
        clients.push(row?);
    }
    Ok(clients)
}

pub fn get_client(conn: &Connection, id: &str) -> anyhow::Result<Option<Client>> {
    Ok(conn
        .query_row(
            "SELECT id, name, logo_url, website, created_at FROM clients WHERE id = ?1",
            params![id],
            parse_client_row,
        )
        .optional()?)
}

pub fn create_client(conn: &Connection, client: &Client) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO clients (id, name, logo_url, website, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            client.id,
            client.name,
            client.logo_url,
            client.website,
            client.created_at,
        ],
    )?;
    Ok(())
}

pub fn update_client(conn: &Connection, client: &Client) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE clients SET name = ?1, logo_url = ?2, website = ?3 WHERE id = ?4",
        params![client.name, client.logo_url, client.website, client.id],
    )?;
    Ok(count > 0)
}

pub fn delete_client(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM clients WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_client_row(row: &rusqlite::Row) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        logo_url: row.get(2)?,
        website: row.get(3)?,
        created_at: row.get(4)?,
    })
}

// ── Portfolio ──

pub fn list_project_categories(conn: &Connection) -> anyhow::Result<Vec<ProjectCategory>> {
    let mut stmt =
        conn.prepare("SELECT id, name, slug FROM project_categories ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(ProjectCategory {
            id: row.get(0)?,
            name: row.get(1)?,
            slug: row.get(2)?,
        })
    })?;

    let mut categories = vec![];
    for row in rows {
        categories.push(row?);
    }
    Ok(categories)
}

pub fn create_project_category(conn: &Connection, category: &ProjectCategory) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO project_categories (id, name, slug) VALUES (?1, ?2, ?3)",
        params![category.id, category.name, category.slug],
    )?;
    Ok(())
}

pub fn delete_project_category(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM project_categories WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

const PROJECT_COLUMNS: &str =
    "p.id, p.title, p.description, p.image_url, p.category_id, p.link, p.featured, p.created_at";

/// Projects, featured first. `category_slug` narrows to one category.
pub fn list_projects(conn: &Connection, category_slug: Option<&str>) -> anyhow::Result<Vec<Project>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects p
         LEFT JOIN project_categories c ON c.id = p.category_id
         WHERE ?1 IS NULL OR c.slug = ?1
         ORDER BY p.featured DESC, p.created_at DESC, p.rowid DESC"
    ))?;
    let rows = stmt.query_map(params![category_slug], parse_project_row)?;

    let mut projects = vec![];
    for row in rows {
        projects.push(row?);
    }
    Ok(projects)
}

pub fn get_project(conn: &Connection, id: &str) -> anyhow::Result<Option<Project>> {
    Ok(conn
        .query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?1"),
            params![id],
            parse_project_row,
        )
        .optional()?)
}

pub fn create_project(conn: &Connection, project: &Project) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO projects (id, title, description, image_url, category_id, link, featured, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            project.id,
            project.title,
            project.description,
            project.image_url,
            project.category_id,
            project.link,
            project.featured as i32,
            project.created_at,
        ],
    )?;
    Ok(())
}

pub fn update_project(conn: &Connection, project: &Project) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE projects SET title = ?1, description = ?2, image_url = ?3, category_id = ?4, link = ?5, featured = ?6
         WHERE id = ?7",
        params![
            project.title,
            project.description,
            project.image_url,
            project.category_id,
            project.link,
            project.featured as i32,
            project.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_project(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_project_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        category_id: row.get(4)?,
        link: row.get(5)?,
        featured: row.get::<_, i32>(6)? != 0,
        created_at: row.get(7)?,
    })
}

// ── Users ──

const USER_COLUMNS: &str = "id, email, full_name, role, password_hash, created_at";

pub fn list_users(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, rowid ASC"
    ))?;
    let rows = stmt.query_map([], parse_user_row)?;

    let mut users = vec![];
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            parse_user_row,
        )
        .optional()?)
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower(?1)"),
            params![email],
            parse_user_row,
        )
        .optional()?)
}

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, full_name, role, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.email,
            user.full_name,
            user.role.as_str(),
            user.password_hash,
            user.created_at,
        ],
    )?;
    Ok(())
}

pub fn update_user(conn: &Connection, user: &User) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET full_name = ?1, role = ?2, password_hash = ?3 WHERE id = ?4",
        params![user.full_name, user.role.as_str(), user.password_hash, user.id],
    )?;
    Ok(count > 0)
}

pub fn delete_user(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        role: UserRole::parse(&role),
        password_hash: row.get(4)?,
        created_at: row.get(5)?,
    })
}

// ── Contact Messages ──

pub fn insert_contact_message(conn: &Connection, message: &ContactMessage) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO contact_messages (id, name, email, company, phone, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            message.id,
            message.name,
            message.email,
            message.company,
            message.phone,
            message.message,
            message.created_at,
        ],
    )?;
    Ok(())
}

pub fn list_contact_messages(conn: &Connection, limit: i64) -> anyhow::Result<Vec<ContactMessage>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, company, phone, message, created_at
         FROM contact_messages ORDER BY created_at DESC, rowid DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit], |row| {
        Ok(ContactMessage {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            company: row.get(3)?,
            phone: row.get(4)?,
            message: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;

    let mut messages = vec![];
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}
